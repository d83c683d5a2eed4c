//! Key-space layout.
//!
//! ```text
//! {bucket}:{primary key}          primary rows
//! _i.{bucket}.{index}:{index key} posting lists
//! _s.{name}                       standalone sequences
//! _s.{bucket}.{name}              bucket-scoped sequences
//! ```
//!
//! Names never contain `:` or `.` and never start with `_`, so no two of
//! these prefixes can overlap.

use strata_kv::prefix_end;

/// Prefix shared by every posting-list row.
pub const INDEX_PREFIX: &str = "_i.";

/// Prefix shared by every sequence counter.
pub const SEQUENCE_PREFIX: &str = "_s.";

/// A fixed key prefix with helpers to build, strip and scan keys below it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Keyspace {
    prefix: Vec<u8>,
}

impl Keyspace {
    /// Space holding a bucket's primary rows.
    pub fn rows(bucket: &str) -> Self {
        Self {
            prefix: format!("{bucket}:").into_bytes(),
        }
    }

    /// Space holding one index's posting lists.
    pub fn index(bucket: &str, index: &str) -> Self {
        Self {
            prefix: format!("{INDEX_PREFIX}{bucket}.{index}:").into_bytes(),
        }
    }

    /// Full store key for `suffix`.
    pub fn key(&self, suffix: &[u8]) -> Vec<u8> {
        let mut key = Vec::with_capacity(self.prefix.len() + suffix.len());
        key.extend_from_slice(&self.prefix);
        key.extend_from_slice(suffix);
        key
    }

    /// The part of `full` after the prefix, if `full` lies in this space.
    pub fn strip<'a>(&self, full: &'a [u8]) -> Option<&'a [u8]> {
        full.strip_prefix(self.prefix.as_slice())
    }

    /// `[start, end)` covering every key in this space that starts with
    /// `suffix_prefix`.
    pub fn range(&self, suffix_prefix: &[u8]) -> (Vec<u8>, Option<Vec<u8>>) {
        let start = self.key(suffix_prefix);
        let end = prefix_end(&start);
        (start, end)
    }
}

/// Store key of a standalone sequence.
pub fn sequence_key(name: &str) -> Vec<u8> {
    format!("{SEQUENCE_PREFIX}{name}").into_bytes()
}

/// Store key of a bucket-scoped sequence.
pub fn scoped_sequence_key(bucket: &str, name: &str) -> Vec<u8> {
    format!("{SEQUENCE_PREFIX}{bucket}.{name}").into_bytes()
}
