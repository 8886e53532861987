use thiserror::Error;

/// Startup configuration problems
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("CORS_ORIGINS must list at least one origin")]
    NoOrigins,

    #[error("Invalid CORS origin: {origin}")]
    InvalidOrigin { origin: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
