//! Recommender crate for the ReelRecs service.
//!
//! Wraps a loaded ranking model and turns anonymous viewing histories into
//! ranked, titled recommendations.

pub mod error;
pub mod recommender;
pub mod titles;

pub use error::{RecommenderError, Result, ValidationError};
pub use recommender::{U2IRecommender, UserFeatures};
pub use titles::{add_titles, TitledRecommendation};

// Handy for callers that only depend on this crate
pub use pipeline::{FeatureConfig, Recommendation};
