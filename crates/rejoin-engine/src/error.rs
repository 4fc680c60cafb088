//! Engine error types.

use std::path::PathBuf;

use thiserror::Error;

use rejoin_connector::error::ConnectorError;

/// Errors from the snapshot store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed.
    #[error("snapshot store I/O failed: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot could not be serialized or deserialized.
    #[error("snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A history file for the same capture second already exists.
    ///
    /// Surfaced instead of overwriting history; the caller decides whether
    /// to treat the run as failed.
    #[error("history snapshot already exists: {path}")]
    HistoryCollision { path: PathBuf },
}

impl StoreError {
    /// Create an I/O error with context.
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        StoreError::Io {
            message: message.into(),
            source,
        }
    }
}

/// Result type for snapshot store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from the reconciliation and cleanup engines.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A source fetch or mutation failed; the pass fails as a whole.
    #[error("source operation failed: {0}")]
    Source(#[from] ConnectorError),

    /// Snapshot persistence failed; a pass whose snapshot cannot be saved
    /// is not treated as completed.
    #[error("snapshot persistence failed: {0}")]
    Store(#[from] StoreError),

    /// The operation observed the cancellation signal and stopped.
    #[error("operation cancelled")]
    Cancelled,
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
