//! The ranking model capability.
//!
//! The recommender never looks inside a model: it hands over a dataset and
//! gets ranked items back. Anything implementing `Model` can be plugged in,
//! including test doubles.

use data_loader::ItemId;
use serde::Serialize;

use crate::dataset::Dataset;
use crate::error::ModelError;
use crate::id_map::UserKey;

/// One ranked item for one user. Rank 1 is the most relevant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub user: UserKey,
    pub item_id: ItemId,
    pub rank: usize,
    pub score: f32,
}

/// A trained ranking model.
///
/// ## Design Note
/// - `Send + Sync` lets one loaded model serve concurrent requests; an
///   implementation must only read its own state inside `recommend`
/// - `users` are external keys that must be present in `dataset`
pub trait Model: Send + Sync {
    /// Returns the name of this model (for logging/debugging)
    fn name(&self) -> &str;

    /// Size of the item space the model was trained on, if it knows it
    fn trained_items(&self) -> Option<usize> {
        None
    }

    /// Produce up to `k` recommendations per user.
    ///
    /// # Arguments
    /// * `users` - Users to recommend for
    /// * `dataset` - Interactions (and features) in the model's item space
    /// * `k` - Maximum number of items per user
    /// * `filter_viewed` - Exclude items the user interacted with
    ///
    /// # Returns
    /// Rows grouped by user in `users` order, ranks `1..=n` within a user
    fn recommend(
        &self,
        users: &[UserKey],
        dataset: &Dataset,
        k: usize,
        filter_viewed: bool,
    ) -> Result<Vec<Recommendation>, ModelError>;
}
