//! Popularity baseline: the same ranking for everybody.

use pipeline::{Dataset, Model, ModelError, Recommendation, UserKey};

use crate::ranking::{check_item_space, recommend_each};

pub struct PopularModel {
    name: String,
    /// Popularity per internal item id
    scores: Vec<f32>,
}

impl PopularModel {
    pub fn new(name: impl Into<String>, scores: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            scores,
        }
    }
}

impl Model for PopularModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn trained_items(&self) -> Option<usize> {
        Some(self.scores.len())
    }

    fn recommend(
        &self,
        users: &[UserKey],
        dataset: &Dataset,
        k: usize,
        filter_viewed: bool,
    ) -> Result<Vec<Recommendation>, ModelError> {
        check_item_space(dataset, self.scores.len())?;
        recommend_each(users, dataset, k, filter_viewed, |_history| {
            self.scores
                .iter()
                .enumerate()
                .map(|(item, &score)| (item as u32, score))
                .collect()
        })
    }
}
