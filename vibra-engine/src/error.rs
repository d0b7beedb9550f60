//! Error types for vibra-engine
//!
//! Defines engine-specific error types using thiserror for clear error
//! propagation.

use thiserror::Error;

/// Main error type for the vibra engine
#[derive(Error, Debug)]
pub enum Error {
    /// Errors from the shared data layer (timeline, catalog, config)
    #[error(transparent)]
    Common(#[from] vibra_common::Error),

    /// Actuator dispatch failures (device busy, policy block, driver fault)
    #[error("Actuator error: {0}")]
    Actuator(String),

    /// Invalid state for the requested operation
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Convenience Result type using the engine Error
pub type Result<T> = std::result::Result<T, Error>;
