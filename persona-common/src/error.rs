//! Shared error types for Persona services
//!
//! Covers the two concerns the shared layer owns: the questionnaire/job
//! store and configuration. Request-level errors (authorization, not-found,
//! bad input) belong to each service's API error type, not here.

use thiserror::Error;

/// Common result type for Persona operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from the shared storage and configuration layer
#[derive(Error, Debug)]
pub enum Error {
    /// Underlying store failure (wraps sqlx::Error)
    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    /// A persisted record did not decode into its domain type
    ///
    /// Rows are written only by this codebase, so a decode failure means
    /// the database holds data from an incompatible version or was edited
    /// out-of-band.
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    /// A domain value could not be encoded for storage
    #[error("Failed to encode for storage: {0}")]
    Encode(String),

    /// Configuration loading, parsing, or resolution failure
    #[error("Configuration error: {0}")]
    Config(String),
}
