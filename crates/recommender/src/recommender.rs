//! # User-to-Item Recommender
//!
//! Coordinates the recommendation pipeline around a loaded model:
//! 1. Load the model artifact (once)
//! 2. Prepare categorical features from the catalog (once)
//! 3. Weight interactions and build the training dataset (once)
//! 4. Per request: turn viewed items into a synthetic single-user history
//! 5. Map that history through the training item id space
//! 6. Ask the model for the top K unseen items
//!
//! Only the item id map (and the user feature space) of the training
//! dataset is kept; request datasets borrow it through an `Arc`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use data_loader::{Catalog, ItemId};
use pipeline::{
    CategoricalFeatures, Dataset, DatasetBuilder, FeatureConfig, FeaturePreparer, IdMap,
    InteractionFrame, Interactions, ItemIdMap, Model, Recommendation, UserKey, SYNTHETIC_USER,
};

use crate::error::{RecommenderError, Result, ValidationError};

/// Ad-hoc user attributes supplied with a request (feature -> value)
pub type UserFeatures = HashMap<String, String>;

/// Ready-to-query recommender bound to one loaded model.
///
/// `recommend` only reads shared state, so an `Arc<U2IRecommender>` can be
/// used from many threads at once as long as the model is itself read-only
/// during inference (all models of the `models` crate are).
pub struct U2IRecommender {
    model: Box<dyn Model>,
    item_id_map: Arc<ItemIdMap>,
    user_features: Option<Arc<CategoricalFeatures>>,
}

impl U2IRecommender {
    /// Load the model at `model_path` and build the training dataset.
    ///
    /// Every failure here is fatal for the caller: nothing is retried.
    pub fn new(model_path: &Path, catalog: &Catalog, config: &FeatureConfig) -> Result<Self> {
        info!("Loading model from {}", model_path.display());
        let model = models::load_model(model_path)?;
        Self::with_model(model, catalog, config)
    }

    /// Build the recommender around an already loaded (or mock) model
    pub fn with_model(model: Box<dyn Model>, catalog: &Catalog, config: &FeatureConfig) -> Result<Self> {
        let start_time = Instant::now();

        let preparer = FeaturePreparer::new(config.clone());
        let item_features = preparer.prepare_item_features(&catalog.items)?;
        let user_features = preparer.prepare_user_features(&catalog.users)?;
        let item_names = preparer.item_feature_names();
        let user_names = preparer.user_feature_names();

        let frame = InteractionFrame::from_raw(&catalog.interactions);
        let dataset = DatasetBuilder::new(&frame)
            .user_features(&user_features, &user_names)
            .item_features(&item_features, &item_names)
            .build()?;

        if let Some(model_items) = model.trained_items() {
            if dataset.n_items() > model_items {
                return Err(RecommenderError::IncompatibleModel {
                    model_items,
                    dataset_items: dataset.n_items(),
                });
            }
        }

        info!(
            "Recommender ready with model `{}` over {} items in {:.2?}",
            model.name(),
            dataset.n_items(),
            start_time.elapsed()
        );

        Ok(Self {
            model,
            item_id_map: dataset.item_id_map().clone(),
            user_features: dataset.user_features().cloned(),
        })
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Item id space shared with every request dataset
    pub fn item_id_map(&self) -> &Arc<ItemIdMap> {
        &self.item_id_map
    }

    /// Top `k` unseen items for an anonymous viewing history.
    ///
    /// Viewed items unknown to the model are dropped; if nothing is left
    /// the request is rejected exactly like an empty history.
    pub fn recommend(
        &self,
        viewed_items: &[ItemId],
        k: usize,
        user_features: Option<&UserFeatures>,
    ) -> Result<Vec<Recommendation>> {
        if k == 0 {
            return Err(ValidationError::NonPositiveK.into());
        }

        let user = UserKey::synthetic(SYNTHETIC_USER);
        let mut frame = InteractionFrame::synthetic(user.clone(), viewed_items);
        frame.retain(|row| self.item_id_map.contains(&row.item_id));

        let dropped = viewed_items.len() - frame.len();
        if dropped > 0 {
            debug!("Dropped {} viewed items unknown to the model", dropped);
        }
        if frame.is_empty() {
            return Err(ValidationError::EmptyHistory.into());
        }

        let dataset = self.request_dataset(&user, &frame, user_features);
        let recommendations = self.model.recommend(&[user], &dataset, k, true)?;
        debug!(
            "Model `{}` returned {} recommendations for {} viewed items",
            self.model.name(),
            recommendations.len(),
            frame.len()
        );
        Ok(recommendations)
    }

    /// Dataset scoped to the synthetic user, in the training item space
    fn request_dataset(
        &self,
        user: &UserKey,
        frame: &InteractionFrame,
        user_features: Option<&UserFeatures>,
    ) -> Dataset {
        let user_id_map = IdMap::from_values([user.clone()]);
        let (interactions, _) = Interactions::from_frame(frame, &user_id_map, &self.item_id_map);
        let dataset = Dataset::new(user_id_map, self.item_id_map.clone(), interactions);

        match (&self.user_features, user_features) {
            (Some(space), Some(features)) => {
                let encoded = space.encode(features.iter().map(|(f, v)| (f.as_str(), v.as_str())));
                debug!("Encoded {} of {} user features", encoded.len(), features.len());
                dataset.with_user_features(Arc::new(space.with_rows(vec![encoded])))
            }
            _ => dataset,
        }
    }
}
