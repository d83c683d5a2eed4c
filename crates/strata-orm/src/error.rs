//! Error types for the object engine.

use thiserror::Error;

/// Errors that can occur during bucket, index and sequence operations.
#[derive(Debug, Error)]
pub enum OrmError {
    /// The payload failed its own validation.
    #[error("invalid model: {0}")]
    Invalid(String),

    /// A required value is missing or a posting list has no members.
    #[error("empty: {0}")]
    Empty(String),

    /// The key is absent where presence is required.
    #[error("not found: {0}")]
    NotFound(String),

    /// The reference is already part of the posting list.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The index name is not registered on the bucket.
    #[error("invalid index: {0}")]
    InvalidIndex(String),

    /// An index with this name is already registered on the bucket.
    #[error("duplicate index: {0}")]
    DuplicateIndex(String),

    /// A value or destination does not match the bucket's model type.
    #[error("wrong type: expected {expected}, got {actual}")]
    WrongType { expected: String, actual: String },

    /// A unique index would map one index key to two primary keys.
    #[error("unique constraint violated on index {index} for key {key}")]
    UniqueConstraintViolation { index: String, key: String },

    /// A posting list references a primary row that does not exist.
    #[error("index {index} references missing row {key}")]
    DanglingReference { index: String, key: String },

    /// The type was never registered with the codec.
    #[error("unregistered type: {0}")]
    UnregisteredType(String),

    /// The codec registry rejected a registration.
    #[error("codec registration failed: {0}")]
    Registration(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A bucket, index or sequence name is malformed.
    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// The sequence counter cannot advance any further.
    #[error("sequence {0} exhausted")]
    SequenceExhausted(String),

    /// Underlying store failure.
    #[error("store error: {0}")]
    Store(#[from] strata_kv::KvError),
}

/// Convenience alias for engine results.
pub type OrmResult<T> = Result<T, OrmError>;

impl OrmError {
    /// Build a [`OrmError::WrongType`] from Rust type names.
    pub fn wrong_type(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::WrongType {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
