//! Error types for dataset preparation and model inference.

use thiserror::Error;

use crate::id_map::UserKey;

/// Configuration problems detected while preparing features or building
/// a dataset. All of them are fatal at recommender construction time.
#[derive(Error, Debug, PartialEq)]
pub enum PipelineError {
    /// A configured feature column is absent from the input table
    #[error("Feature column `{column}` is missing from the {table} table")]
    MissingFeatureColumn { table: String, column: String },

    /// A feature table row carries a feature that was not declared categorical
    #[error("{kind} feature `{feature}` is not declared as categorical")]
    UndeclaredFeature { kind: String, feature: String },

    /// A declared categorical feature never occurs in the feature table
    #[error("Categorical {kind} feature `{feature}` is absent from the feature table")]
    UnknownCategoricalFeature { kind: String, feature: String },

    /// A dataset cannot be built from zero interactions
    #[error("Cannot build a dataset from an empty interaction frame")]
    EmptyInteractions,
}

/// Failures raised by a ranking model at inference time
#[derive(Error, Debug, PartialEq)]
pub enum ModelError {
    /// The requested user is not part of the dataset passed in
    #[error("User {0} is not present in the dataset")]
    UnknownUser(UserKey),

    /// The dataset's item space does not fit the trained model
    #[error("Dataset has {found} items but the model was trained on {expected}")]
    IncompatibleDataset { expected: usize, found: usize },

    #[error("Inference failed: {0}")]
    Inference(String),
}
