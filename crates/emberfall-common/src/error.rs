//! Error types for Emberfall.
//!
//! The running simulation never surfaces errors; these cover loading content
//! and configuration before a simulation starts.

use thiserror::Error;

use crate::SchemaVersion;

/// Top-level error type for Emberfall operations.
#[derive(Debug, Error)]
pub enum EmberError {
    /// Content files (spells, status effects) could not be used.
    #[error("Content error: {0}")]
    Content(String),

    /// Host configuration could not be used.
    #[error("Config error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Schema version mismatch
    #[error("Schema version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Version this build understands
        expected: SchemaVersion,
        /// Version found in the data
        actual: SchemaVersion,
    },
}

/// Result type alias for Emberfall operations.
pub type EmberResult<T> = Result<T, EmberError>;
