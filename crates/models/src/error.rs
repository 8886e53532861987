use thiserror::Error;

/// Errors that can occur when loading or saving a model artifact
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Failed to read model artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed model artifact: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Unsupported artifact format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Invalid model artifact: {0}")]
    Invalid(String),
}
