//! Server crate for the ReelRecs recommendation service.
//!
//! Bootstraps the service: environment configuration, the recommender
//! loaded at startup, the database pool lifecycle and CORS middleware.

pub mod app;
pub mod config;
pub mod cors;
pub mod database;
pub mod error;

pub use app::{build_router, load_recommender, run, AppState};
pub use config::{Config, CorsSettings, DatabaseSettings, RecommenderSettings};
pub use cors::cors_layer;
pub use database::DatabaseManager;
pub use error::ConfigError;
