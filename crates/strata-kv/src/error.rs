use std::path::PathBuf;

/// Errors from key/value store operations.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    /// Keys must contain at least one byte.
    #[error("key must not be empty")]
    EmptyKey,

    /// A cursor was requested with `start >= end`.
    #[error("invalid range: start must sort before end")]
    InvalidRange,

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted snapshot failed its integrity checks.
    #[error("corrupt store file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// The backend failed in a way that would otherwise have panicked.
    #[error("backend failure: {0}")]
    Backend(String),
}

/// Result alias for store operations.
pub type KvResult<T> = Result<T, KvError>;
