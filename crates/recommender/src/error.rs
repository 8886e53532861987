use models::ArtifactError;
use pipeline::{ModelError, PipelineError};
use thiserror::Error;

/// Per-request input problems. These never bring the service down.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("k must be a positive integer")]
    NonPositiveK,

    /// Raised both for an empty history and for one made only of items
    /// unknown to the model
    #[error("at least one viewed item known to the model is required")]
    EmptyHistory,
}

#[derive(Error, Debug)]
pub enum RecommenderError {
    #[error("Failed to load model: {0}")]
    ModelLoad(#[from] ArtifactError),

    #[error("Invalid configuration: {0}")]
    Configuration(#[from] PipelineError),

    #[error("Model trained on {model_items} items cannot serve a catalog of {dataset_items} items")]
    IncompatibleModel {
        model_items: usize,
        dataset_items: usize,
    },

    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Model inference failed: {0}")]
    Model(#[from] ModelError),
}

pub type Result<T> = std::result::Result<T, RecommenderError>;
