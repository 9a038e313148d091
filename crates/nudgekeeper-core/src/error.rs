//! Core error types for nudgekeeper-core.
//!
//! Four error families map onto the engine's failure taxonomy: validation
//! failures are rejected before persistence, not-found covers both absent
//! and not-owned rows, version conflicts surface to the caller for
//! re-fetch-and-retry, and backend errors are the transient storage kind
//! the sweep logs and retries on the next pass.

use std::path::PathBuf;
use thiserror::Error;

use crate::commitment::CommitmentStatus;

/// Core error type for nudgekeeper-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Store-related errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Store-specific errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Commitment id absent, or owned by a different user. The two cases
    /// are deliberately indistinguishable to the caller.
    #[error("Commitment not found: {id}")]
    NotFound { id: String },

    /// Optimistic version check failed on a user-initiated update.
    #[error("Version conflict on {id}: expected {expected}, found {actual}")]
    Conflict {
        id: String,
        expected: i64,
        actual: i64,
    },

    /// Underlying storage failure; transient from the sweep's point of
    /// view (the row stays scheduled and is retried next pass).
    #[error("Storage error: {0}")]
    Backend(#[from] rusqlite::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A commitment outside `draft` must carry a concrete due time.
    #[error("Commitment in status '{status}' requires a due time")]
    MissingWhenTime { status: CommitmentStatus },

    /// Attempted lifecycle transition the state machine forbids.
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: CommitmentStatus,
        to: CommitmentStatus,
    },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Custom(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
