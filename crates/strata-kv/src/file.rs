//! Snapshot-persisted store.
//!
//! [`FileKvStore`] keeps every pair in an [`InMemoryKvStore`] and writes the
//! whole map to disk on [`FileKvStore::flush`] (and on drop, if dirty).
//!
//! On-disk format:
//! ```text
//! [4 bytes: magic "STKV"]
//! [4 bytes: CRC32 of payload (little-endian u32)]
//! [N bytes: payload (bincode-serialized Vec<(key, value)>, ascending)]
//! ```
//!
//! Snapshots are written to a temporary file in the target directory and
//! renamed over the previous snapshot, so a crash leaves either the old or
//! the new snapshot in place.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{KvError, KvResult};
use crate::memory::{InMemoryKvStore, MemoryBatch};
use crate::traits::{Batch, KvIter, KvPair, KvStore, ReadOnlyKvStore};

const MAGIC: &[u8; 4] = b"STKV";

/// Header size: 4 bytes magic + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Ordered store persisted as a single checksummed snapshot file.
pub struct FileKvStore {
    path: PathBuf,
    inner: InMemoryKvStore,
    dirty: AtomicBool,
}

impl FileKvStore {
    /// Open the snapshot at `path`. A missing file yields an empty store.
    pub fn open(path: impl AsRef<Path>) -> KvResult<Self> {
        let path = path.as_ref().to_path_buf();
        let inner = match fs::read(&path) {
            Ok(bytes) => InMemoryKvStore::from_pairs(decode_snapshot(&path, &bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => InMemoryKvStore::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), keys = inner.len(), "opened file store");
        Ok(Self {
            path,
            inner,
            dirty: AtomicBool::new(false),
        })
    }

    /// Location of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if there are writes not yet flushed to disk.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Write the current contents to disk if anything changed.
    pub fn flush(&self) -> KvResult<()> {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        if let Err(e) = self.write_snapshot() {
            self.dirty.store(true, Ordering::Release);
            return Err(e);
        }
        Ok(())
    }

    fn write_snapshot(&self) -> KvResult<()> {
        let pairs = self.inner.snapshot()?;
        let bytes = encode_snapshot(&pairs)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| KvError::Io(e.error))?;

        debug!(path = %self.path.display(), keys = pairs.len(), bytes = bytes.len(), "snapshot flushed");
        Ok(())
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }
}

impl ReadOnlyKvStore for FileKvStore {
    fn get(&self, key: &[u8]) -> KvResult<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn has(&self, key: &[u8]) -> KvResult<bool> {
        self.inner.has(key)
    }

    fn iterator(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> KvResult<KvIter<'_>> {
        self.inner.iterator(start, end)
    }

    fn reverse_iterator(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> KvResult<KvIter<'_>> {
        self.inner.reverse_iterator(start, end)
    }
}

impl KvStore for FileKvStore {
    fn set(&self, key: &[u8], value: &[u8]) -> KvResult<()> {
        self.inner.set(key, value)?;
        self.mark_dirty();
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> KvResult<()> {
        self.inner.delete(key)?;
        self.mark_dirty();
        Ok(())
    }

    fn new_batch(&self) -> Box<dyn Batch + '_> {
        Box::new(FileBatch {
            inner: MemoryBatch::new(&self.inner),
            dirty: &self.dirty,
        })
    }
}

impl Drop for FileKvStore {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(path = %self.path.display(), error = %e, "failed to flush store on drop");
        }
    }
}

impl std::fmt::Debug for FileKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileKvStore")
            .field("path", &self.path)
            .field("key_count", &self.inner.len())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

struct FileBatch<'a> {
    inner: MemoryBatch<'a>,
    dirty: &'a AtomicBool,
}

impl Batch for FileBatch<'_> {
    fn set(&mut self, key: &[u8], value: &[u8]) -> KvResult<()> {
        self.inner.set(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> KvResult<()> {
        self.inner.delete(key)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn write(self: Box<Self>) -> KvResult<()> {
        let FileBatch { inner, dirty } = *self;
        if inner.is_empty() {
            return Ok(());
        }
        Box::new(inner).write()?;
        dirty.store(true, Ordering::Release);
        Ok(())
    }
}

fn encode_snapshot(pairs: &[KvPair]) -> KvResult<Vec<u8>> {
    let payload =
        bincode::serialize(pairs).map_err(|e| KvError::Serialization(e.to_string()))?;
    let crc = crc32fast::hash(&payload);

    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

fn decode_snapshot(path: &Path, bytes: &[u8]) -> KvResult<Vec<KvPair>> {
    let corrupt = |reason: String| KvError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };

    if bytes.len() < HEADER_SIZE {
        return Err(corrupt(format!("truncated header ({} bytes)", bytes.len())));
    }
    if &bytes[..4] != MAGIC {
        return Err(corrupt("bad magic".into()));
    }
    let expected_crc = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    let payload = &bytes[HEADER_SIZE..];
    let actual_crc = crc32fast::hash(payload);
    if actual_crc != expected_crc {
        return Err(corrupt(format!(
            "CRC mismatch: expected {expected_crc:08x}, computed {actual_crc:08x}"
        )));
    }

    bincode::deserialize(payload).map_err(|e| corrupt(format!("undecodable payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("strata.db");
        (dir, path)
    }

    #[test]
    fn missing_file_opens_empty() {
        let (_dir, path) = temp_store();
        let store = FileKvStore::open(&path).unwrap();
        assert!(store.is_empty());
        assert!(!store.is_dirty());
    }

    #[test]
    fn flush_and_reopen() {
        let (_dir, path) = temp_store();
        {
            let store = FileKvStore::open(&path).unwrap();
            store.set(b"alpha", b"1").unwrap();
            store.set(b"beta", b"2").unwrap();
            assert!(store.is_dirty());
            store.flush().unwrap();
            assert!(!store.is_dirty());
        }

        let reopened = FileKvStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get(b"beta").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn drop_flushes_dirty_store() {
        let (_dir, path) = temp_store();
        {
            let store = FileKvStore::open(&path).unwrap();
            store.set(b"k", b"v").unwrap();
        }
        let reopened = FileKvStore::open(&path).unwrap();
        assert_eq!(reopened.get(b"k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn batch_write_marks_dirty() {
        let (_dir, path) = temp_store();
        let store = FileKvStore::open(&path).unwrap();
        let mut batch = store.new_batch();
        batch.set(b"a", b"1").unwrap();
        batch.set(b"b", b"2").unwrap();
        assert!(!store.is_dirty());
        batch.write().unwrap();
        assert!(store.is_dirty());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn empty_batch_leaves_store_clean() {
        let (_dir, path) = temp_store();
        let store = FileKvStore::open(&path).unwrap();
        store.new_batch().write().unwrap();
        assert!(!store.is_dirty());
    }

    #[test]
    fn delete_persists() {
        let (_dir, path) = temp_store();
        {
            let store = FileKvStore::open(&path).unwrap();
            store.set(b"gone", b"x").unwrap();
            store.flush().unwrap();
            store.delete(b"gone").unwrap();
        }
        let reopened = FileKvStore::open(&path).unwrap();
        assert!(!reopened.has(b"gone").unwrap());
    }

    #[test]
    fn crc_mismatch_is_corrupt() {
        let (_dir, path) = temp_store();
        {
            let store = FileKvStore::open(&path).unwrap();
            store.set(b"k", b"value").unwrap();
        }
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        fs::write(&path, &bytes).unwrap();

        let err = FileKvStore::open(&path).unwrap_err();
        assert!(matches!(err, KvError::Corrupt { .. }));
    }

    #[test]
    fn bad_magic_is_corrupt() {
        let (dir, _) = temp_store();
        let path = dir.path().join("junk.db");
        fs::write(&path, b"NOPE0000payload").unwrap();
        let err = FileKvStore::open(&path).unwrap_err();
        assert!(matches!(err, KvError::Corrupt { .. }));
    }

    #[test]
    fn truncated_header_is_corrupt() {
        let (dir, _) = temp_store();
        let path = dir.path().join("short.db");
        fs::write(&path, b"STK").unwrap();
        let err = FileKvStore::open(&path).unwrap_err();
        assert!(matches!(err, KvError::Corrupt { .. }));
    }

    #[test]
    fn snapshot_roundtrip_preserves_order() {
        let pairs = vec![
            (b"a".to_vec(), b"1".to_vec()),
            (b"b".to_vec(), Vec::new()),
        ];
        let bytes = encode_snapshot(&pairs).unwrap();
        assert_eq!(&bytes[..4], MAGIC);
        let decoded = decode_snapshot(Path::new("mem"), &bytes).unwrap();
        assert_eq!(decoded, pairs);
    }
}
