//! Ordered key/value store contract for Strata.
//!
//! The object engine in `strata-orm` never talks to a concrete database. It
//! is written against the traits in this crate, and any host that provides
//! byte-ordered keys, range cursors and atomic batches can back it.
//!
//! # Hosts
//!
//! - [`InMemoryKvStore`] -- `BTreeMap`-based store for tests and embedding
//! - [`FileKvStore`] -- in-memory store persisted as a checksummed snapshot
//!
//! # Contract
//!
//! 1. Keys are compared byte-wise; cursors are ascending or descending in
//!    that order, with an exclusive end bound.
//! 2. Empty keys are rejected with [`KvError::EmptyKey`].
//! 3. A [`Batch`] applies all of its queued operations at once on
//!    [`Batch::write`], or none of them if it is dropped.
//! 4. No writes may happen within a range while a cursor over it is in use.
//! 5. Backend failures are returned as errors, never raised as panics.

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{KvError, KvResult};
pub use file::FileKvStore;
pub use memory::{InMemoryKvStore, MemoryBatch};
pub use traits::{prefix_end, Batch, BatchOp, KvIter, KvPair, KvStore, ReadOnlyKvStore};
