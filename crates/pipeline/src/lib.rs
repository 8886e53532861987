//! Data preparation for the recommendation pipeline.
//!
//! This crate provides:
//! - FeaturePreparer for top-K categorical item/user features
//! - Interaction weighting and synthetic request frames
//! - DatasetBuilder and the shared item id map
//! - The Model trait every ranking model implements
//!
//! ## Architecture
//! Stages compose sequentially:
//! 1. FeaturePreparer turns raw tables into long-format feature tables
//! 2. DatasetBuilder assembles interactions and features into a Dataset
//! 3. A Model ranks items for users of a Dataset
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{DatasetBuilder, FeatureConfig, FeaturePreparer, InteractionFrame};
//!
//! let preparer = FeaturePreparer::new(FeatureConfig::default());
//! let item_features = preparer.prepare_item_features(&catalog.items)?;
//! let user_features = preparer.prepare_user_features(&catalog.users)?;
//! let item_names = preparer.item_feature_names();
//! let user_names = preparer.user_feature_names();
//!
//! let frame = InteractionFrame::from_raw(&catalog.interactions);
//! let dataset = DatasetBuilder::new(&frame)
//!     .user_features(&user_features, &user_names)
//!     .item_features(&item_features, &item_names)
//!     .build()?;
//! ```

pub mod error;
pub mod id_map;
pub mod interactions;
pub mod features;
pub mod dataset;
pub mod traits;

// Re-export main types
pub use error::{ModelError, PipelineError};
pub use id_map::{IdMap, InternalId, ItemIdMap, UserKey};
pub use interactions::{
    engagement_weight, FrameRow, InteractionFrame, ENGAGED_WEIGHT, ENGAGEMENT_THRESHOLD_PCT,
    LIGHT_WEIGHT, PLACEHOLDER_TIMESTAMP, SYNTHETIC_USER,
};
pub use features::{FeatureConfig, FeaturePreparer, FeatureRow, FeatureTable, OTHER_VALUE};
pub use dataset::{CategoricalFeatures, Dataset, DatasetBuilder, InteractionEntry, Interactions};
pub use traits::{Model, Recommendation};
