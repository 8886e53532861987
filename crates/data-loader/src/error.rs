//! Error types for the data-loader crate.
//!
//! Every failure while reading the item, user and interaction tables maps to
//! one variant here. Column-level problems (a required column absent from the
//! header) are kept apart from cell-level problems so callers can report
//! configuration mistakes differently from dirty data.

use thiserror::Error;

/// Errors that can occur during data loading and parsing
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// File could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Line in data file couldn't be parsed
    #[error("Parse error at line {line} in {file}: {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },

    /// A required column is absent from the table header
    #[error("Missing column `{column}` in {table}")]
    MissingColumn { table: String, column: String },

    /// A data field had an invalid value
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// The same identifier appears twice in a table keyed by it
    #[error("Duplicate {entity} id {id}")]
    DuplicateId { entity: String, id: u32 },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DataLoadError>;
