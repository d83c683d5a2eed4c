//! Persistent monotonic counters for primary-key allocation.

use strata_kv::{KvStore, ReadOnlyKvStore};
use tracing::debug;

use crate::error::{OrmError, OrmResult};
use crate::keys::{scoped_sequence_key, sequence_key};
use crate::names::validate_name;

/// A named counter stored under its own key.
///
/// Values start at 1 and are never reused. The counter is persisted as an
/// 8-byte big-endian integer, the same encoding `next_val` hands out as a
/// primary key, so sequence-allocated keys sort in allocation order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sequence {
    name: String,
    key: Vec<u8>,
}

impl Sequence {
    /// A standalone sequence.
    pub fn new(name: &str) -> OrmResult<Self> {
        validate_name(name)?;
        Ok(Self {
            name: name.to_string(),
            key: sequence_key(name),
        })
    }

    /// A sequence private to `bucket`.
    pub fn scoped(bucket: &str, name: &str) -> OrmResult<Self> {
        validate_name(bucket)?;
        validate_name(name)?;
        Ok(Self {
            name: format!("{bucket}.{name}"),
            key: scoped_sequence_key(bucket, name),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store key holding the counter.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Last value handed out, or 0 if none has been.
    pub fn current<S>(&self, store: &S) -> OrmResult<u64>
    where
        S: ReadOnlyKvStore + ?Sized,
    {
        match store.get(&self.key)? {
            Some(bytes) => decode_sequence(&bytes),
            None => Ok(0),
        }
    }

    /// Advance the counter and return the new value.
    ///
    /// Every call consumes a value, so a failed caller must not blindly
    /// retry expecting the same number back.
    pub fn next_int<S>(&self, store: &S) -> OrmResult<u64>
    where
        S: KvStore + ?Sized,
    {
        let next = self
            .current(store)?
            .checked_add(1)
            .ok_or_else(|| OrmError::SequenceExhausted(self.name.clone()))?;
        store.set(&self.key, &encode_sequence(next))?;
        debug!(sequence = %self.name, value = next, "sequence advanced");
        Ok(next)
    }

    /// Advance the counter and return the new value as an 8-byte
    /// big-endian key.
    pub fn next_val<S>(&self, store: &S) -> OrmResult<Vec<u8>>
    where
        S: KvStore + ?Sized,
    {
        Ok(encode_sequence(self.next_int(store)?).to_vec())
    }
}

/// Big-endian encoding of a sequence value.
pub fn encode_sequence(value: u64) -> [u8; 8] {
    value.to_be_bytes()
}

/// Inverse of [`encode_sequence`].
pub fn decode_sequence(bytes: &[u8]) -> OrmResult<u64> {
    let arr: [u8; 8] = bytes.try_into().map_err(|_| {
        OrmError::Serialization(format!(
            "sequence value must be 8 bytes, got {}",
            bytes.len()
        ))
    })?;
    Ok(u64::from_be_bytes(arr))
}
