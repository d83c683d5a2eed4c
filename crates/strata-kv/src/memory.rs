use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{KvError, KvResult};
use crate::traits::{Batch, BatchOp, KvIter, KvPair, KvStore, ReadOnlyKvStore};

/// In-memory, `BTreeMap`-based ordered store.
///
/// Intended for tests and embedding. Keys and values are cloned on the way in
/// and out. Cursors take a snapshot of the requested range when created, so
/// they never hold the lock while the caller iterates.
pub struct InMemoryKvStore {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryKvStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create a store pre-populated with `pairs`.
    pub fn from_pairs(pairs: impl IntoIterator<Item = KvPair>) -> Self {
        Self {
            entries: RwLock::new(pairs.into_iter().collect()),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().expect("lock poisoned").is_empty()
    }

    /// Remove every key.
    pub fn clear(&self) -> KvResult<()> {
        self.write_map()?.clear();
        Ok(())
    }

    /// All pairs in ascending key order.
    pub fn snapshot(&self) -> KvResult<Vec<KvPair>> {
        let map = self.read_map()?;
        Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    /// Apply `ops` in order under a single write lock.
    pub(crate) fn apply(&self, ops: Vec<BatchOp>) -> KvResult<()> {
        let mut map = self.write_map()?;
        for op in ops {
            match op {
                BatchOp::Set { key, value } => {
                    map.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    map.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn read_map(&self) -> KvResult<RwLockReadGuard<'_, BTreeMap<Vec<u8>, Vec<u8>>>> {
        self.entries
            .read()
            .map_err(|e| KvError::Backend(format!("lock poisoned: {e}")))
    }

    fn write_map(&self) -> KvResult<RwLockWriteGuard<'_, BTreeMap<Vec<u8>, Vec<u8>>>> {
        self.entries
            .write()
            .map_err(|e| KvError::Backend(format!("lock poisoned: {e}")))
    }

    fn range(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        reverse: bool,
    ) -> KvResult<KvIter<'_>> {
        if let (Some(s), Some(e)) = (start, end) {
            if s >= e {
                return Err(KvError::InvalidRange);
            }
        }
        let lower = start.map_or(Bound::Unbounded, |s| Bound::Included(s.to_vec()));
        let upper = end.map_or(Bound::Unbounded, |e| Bound::Excluded(e.to_vec()));

        let map = self.read_map()?;
        let mut pairs: Vec<KvPair> = map
            .range::<Vec<u8>, _>((lower, upper))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if reverse {
            pairs.reverse();
        }
        Ok(Box::new(pairs.into_iter()))
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadOnlyKvStore for InMemoryKvStore {
    fn get(&self, key: &[u8]) -> KvResult<Option<Vec<u8>>> {
        check_key(key)?;
        Ok(self.read_map()?.get(key).cloned())
    }

    fn has(&self, key: &[u8]) -> KvResult<bool> {
        check_key(key)?;
        Ok(self.read_map()?.contains_key(key))
    }

    fn iterator(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> KvResult<KvIter<'_>> {
        self.range(start, end, false)
    }

    fn reverse_iterator(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> KvResult<KvIter<'_>> {
        self.range(start, end, true)
    }
}

impl KvStore for InMemoryKvStore {
    fn set(&self, key: &[u8], value: &[u8]) -> KvResult<()> {
        check_key(key)?;
        self.write_map()?.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> KvResult<()> {
        check_key(key)?;
        self.write_map()?.remove(key);
        Ok(())
    }

    fn new_batch(&self) -> Box<dyn Batch + '_> {
        Box::new(MemoryBatch::new(self))
    }
}

impl std::fmt::Debug for InMemoryKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryKvStore")
            .field("key_count", &self.len())
            .finish()
    }
}

/// Batch over an [`InMemoryKvStore`].
pub struct MemoryBatch<'a> {
    store: &'a InMemoryKvStore,
    ops: Vec<BatchOp>,
}

impl<'a> MemoryBatch<'a> {
    pub fn new(store: &'a InMemoryKvStore) -> Self {
        Self {
            store,
            ops: Vec::new(),
        }
    }

    /// Queued operations, in application order.
    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }
}

impl Batch for MemoryBatch<'_> {
    fn set(&mut self, key: &[u8], value: &[u8]) -> KvResult<()> {
        check_key(key)?;
        self.ops.push(BatchOp::Set {
            key: key.to_vec(),
            value: value.to_vec(),
        });
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> KvResult<()> {
        check_key(key)?;
        self.ops.push(BatchOp::Delete { key: key.to_vec() });
        Ok(())
    }

    fn len(&self) -> usize {
        self.ops.len()
    }

    fn write(self: Box<Self>) -> KvResult<()> {
        let MemoryBatch { store, ops } = *self;
        store.apply(ops)
    }
}

pub(crate) fn check_key(key: &[u8]) -> KvResult<()> {
    if key.is_empty() {
        return Err(KvError::EmptyKey);
    }
    Ok(())
}
