//! Error types for vibra-common
//!
//! Defines the shared error type using thiserror for clear error propagation.

use thiserror::Error;

/// Shared error type for the vibra workspace
#[derive(Error, Debug)]
pub enum Error {
    /// Timeline or catalog document failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// JSON parse errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Convenience Result type using the shared Error
pub type Result<T> = std::result::Result<T, Error>;
