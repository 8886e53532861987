//! Item-to-item nearest neighbours.
//!
//! The artifact stores, for each trained item, its most similar items. A
//! user's score for a candidate is the weighted sum of similarities from
//! every item in their history. Candidates no history item links to are
//! not eligible.

use pipeline::{Dataset, InternalId, Model, ModelError, Recommendation, UserKey};
use std::collections::HashMap;

use crate::ranking::{check_item_space, recommend_each};

pub struct ItemKnnModel {
    name: String,
    /// Neighbour list (item, similarity) per internal item id
    neighbors: Vec<Vec<(InternalId, f32)>>,
}

impl ItemKnnModel {
    pub fn new(name: impl Into<String>, neighbors: Vec<Vec<(InternalId, f32)>>) -> Self {
        Self {
            name: name.into(),
            neighbors,
        }
    }

    fn score(&self, history: &[(InternalId, f32)]) -> Vec<(InternalId, f32)> {
        let mut scores: HashMap<InternalId, f32> = HashMap::new();
        for &(item, weight) in history {
            let Some(neighbors) = self.neighbors.get(item as usize) else {
                continue;
            };
            for &(neighbor, similarity) in neighbors {
                *scores.entry(neighbor).or_insert(0.0) += weight * similarity;
            }
        }
        scores.into_iter().collect()
    }
}

impl Model for ItemKnnModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn trained_items(&self) -> Option<usize> {
        Some(self.neighbors.len())
    }

    fn recommend(
        &self,
        users: &[UserKey],
        dataset: &Dataset,
        k: usize,
        filter_viewed: bool,
    ) -> Result<Vec<Recommendation>, ModelError> {
        check_item_space(dataset, self.neighbors.len())?;
        recommend_each(users, dataset, k, filter_viewed, |history| self.score(history))
    }
}
