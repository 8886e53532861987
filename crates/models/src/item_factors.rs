//! Latent item factors (as produced by ALS or SVD style training).
//!
//! The user vector is folded in on the fly as the weighted mean of the
//! history's item vectors; candidates are scored by dot product.

use pipeline::{Dataset, InternalId, Model, ModelError, Recommendation, UserKey};
use rayon::prelude::*;

use crate::ranking::{check_item_space, recommend_each};

pub struct ItemFactorsModel {
    name: String,
    /// One embedding per internal item id, all of the same length
    factors: Vec<Vec<f32>>,
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl ItemFactorsModel {
    pub fn new(name: impl Into<String>, factors: Vec<Vec<f32>>) -> Self {
        Self {
            name: name.into(),
            factors,
        }
    }

    fn dim(&self) -> usize {
        self.factors.first().map(|f| f.len()).unwrap_or(0)
    }

    fn user_vector(&self, history: &[(InternalId, f32)]) -> Option<Vec<f32>> {
        let mut user = vec![0.0f32; self.dim()];
        let mut total = 0.0f32;
        for &(item, weight) in history {
            if let Some(factors) = self.factors.get(item as usize) {
                for (u, f) in user.iter_mut().zip(factors) {
                    *u += weight * f;
                }
                total += weight;
            }
        }
        if total <= 0.0 {
            return None;
        }
        user.iter_mut().for_each(|u| *u /= total);
        Some(user)
    }

    fn score(&self, history: &[(InternalId, f32)]) -> Vec<(InternalId, f32)> {
        let Some(user) = self.user_vector(history) else {
            return Vec::new();
        };
        self.factors
            .par_iter()
            .enumerate()
            .map(|(item, factors)| (item as InternalId, dot(&user, factors)))
            .collect()
    }
}

impl Model for ItemFactorsModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn trained_items(&self) -> Option<usize> {
        Some(self.factors.len())
    }

    fn recommend(
        &self,
        users: &[UserKey],
        dataset: &Dataset,
        k: usize,
        filter_viewed: bool,
    ) -> Result<Vec<Recommendation>, ModelError> {
        check_item_space(dataset, self.factors.len())?;
        recommend_each(users, dataset, k, filter_viewed, |history| self.score(history))
    }
}
