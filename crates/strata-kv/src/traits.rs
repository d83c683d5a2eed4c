use crate::error::KvResult;

/// A key/value pair yielded by a cursor.
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Ordered cursor over a key range.
///
/// Yields pairs in key order (ascending or descending depending on how it was
/// created). `None` means the range is exhausted; cursors never fail midway.
pub type KvIter<'a> = Box<dyn Iterator<Item = KvPair> + 'a>;

/// Read access to an ordered key/value store.
///
/// All implementations must satisfy these invariants:
/// - Keys are ordered byte-wise.
/// - Keys and values passed in are never retained or mutated by the store.
/// - An empty key is an error, not a lookup miss.
pub trait ReadOnlyKvStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    fn get(&self, key: &[u8]) -> KvResult<Option<Vec<u8>>>;

    /// Check whether `key` exists.
    fn has(&self, key: &[u8]) -> KvResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Cursor over `[start, end)` in ascending key order.
    ///
    /// `None` leaves that side of the range unbounded. When both bounds are
    /// given, `start` must sort strictly before `end`.
    fn iterator(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> KvResult<KvIter<'_>>;

    /// Cursor over `[start, end)` in descending key order.
    fn reverse_iterator(&self, start: Option<&[u8]>, end: Option<&[u8]>)
        -> KvResult<KvIter<'_>>;
}

/// Read/write access to an ordered key/value store.
///
/// Writes through `set`/`delete` take effect immediately. Writes that must
/// land together go through [`KvStore::new_batch`].
pub trait KvStore: ReadOnlyKvStore {
    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &[u8], value: &[u8]) -> KvResult<()>;

    /// Remove `key`. Removing an absent key is a no-op.
    fn delete(&self, key: &[u8]) -> KvResult<()>;

    /// Start a batch whose operations are applied atomically on `write`.
    fn new_batch(&self) -> Box<dyn Batch + '_>;
}

/// A single queued batch operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchOp {
    Set { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

impl BatchOp {
    /// The key this operation touches.
    pub fn key(&self) -> &[u8] {
        match self {
            Self::Set { key, .. } | Self::Delete { key } => key,
        }
    }
}

/// Group of writes applied to a store as one atomic unit.
///
/// Operations are applied in the order they were queued, so a later `set` or
/// `delete` of the same key wins. Dropping a batch without calling `write`
/// discards it.
pub trait Batch {
    /// Queue a write of `value` under `key`.
    fn set(&mut self, key: &[u8], value: &[u8]) -> KvResult<()>;

    /// Queue a removal of `key`.
    fn delete(&mut self, key: &[u8]) -> KvResult<()>;

    /// Number of queued operations.
    fn len(&self) -> usize;

    /// Returns `true` if nothing has been queued.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply every queued operation atomically.
    fn write(self: Box<Self>) -> KvResult<()>;
}

/// Exclusive upper bound for a scan over every key starting with `prefix`.
///
/// Returns `None` when no such bound exists (the prefix is empty or made of
/// `0xff` bytes only), in which case the scan is unbounded above.
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xff {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_end_increments_last_byte() {
        assert_eq!(prefix_end(b"abc"), Some(b"abd".to_vec()));
        assert_eq!(prefix_end(b"users:"), Some(b"users;".to_vec()));
    }

    #[test]
    fn prefix_end_carries_over_ff() {
        assert_eq!(prefix_end(&[0x01, 0xff]), Some(vec![0x02]));
        assert_eq!(prefix_end(&[0x00, 0xff, 0xff]), Some(vec![0x01]));
    }

    #[test]
    fn prefix_end_unbounded() {
        assert_eq!(prefix_end(b""), None);
        assert_eq!(prefix_end(&[0xff, 0xff]), None);
    }

    #[test]
    fn batch_op_key() {
        let set = BatchOp::Set {
            key: b"k1".to_vec(),
            value: b"v".to_vec(),
        };
        let del = BatchOp::Delete { key: b"k2".to_vec() };
        assert_eq!(set.key(), b"k1");
        assert_eq!(del.key(), b"k2");
    }
}
