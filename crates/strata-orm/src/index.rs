//! Secondary index definitions and posting-list maintenance.

use std::fmt;
use std::sync::Arc;

use strata_kv::{Batch, ReadOnlyKvStore};
use tracing::warn;

use crate::codec::Codec;
use crate::error::{OrmError, OrmResult};
use crate::keys::Keyspace;
use crate::model::Model;
use crate::multiref::MultiRef;
use crate::object::Object;

/// Derives an index key from an object.
///
/// `Ok(None)` means the object is not represented in the index. An empty key
/// is treated the same way.
pub type Indexer = Arc<dyn Fn(&Object) -> OrmResult<Option<Vec<u8>>> + Send + Sync>;

/// Adapt a typed closure into an [`Indexer`].
///
/// The resulting indexer fails with `WrongType` when handed an object whose
/// payload is not an `M`.
pub fn model_indexer<M, F>(f: F) -> Indexer
where
    M: Model,
    F: Fn(&M) -> OrmResult<Option<Vec<u8>>> + Send + Sync + 'static,
{
    Arc::new(move |obj: &Object| match obj.value_as::<M>() {
        Some(model) => f(model),
        None => Err(OrmError::wrong_type(
            std::any::type_name::<M>(),
            obj.value().type_name(),
        )),
    })
}

/// A named secondary index registered on a bucket.
#[derive(Clone)]
pub struct Index {
    name: String,
    space: Keyspace,
    indexer: Indexer,
    unique: bool,
}

impl fmt::Debug for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Index")
            .field("name", &self.name)
            .field("unique", &self.unique)
            .finish()
    }
}

impl Index {
    pub(crate) fn new(bucket: &str, name: &str, indexer: Indexer, unique: bool) -> Self {
        Self {
            name: name.to_string(),
            space: Keyspace::index(bucket, name),
            indexer,
            unique,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Index key for `obj`, or `None` if it is not indexed here.
    pub fn index_key(&self, obj: Option<&Object>) -> OrmResult<Option<Vec<u8>>> {
        let Some(obj) = obj else {
            return Ok(None);
        };
        Ok((self.indexer)(obj)?.filter(|k| !k.is_empty()))
    }

    /// Load the posting list stored for `index_key`. Stored entries come back
    /// sorted and deduplicated.
    pub fn refs<S>(&self, store: &S, codec: &Codec, index_key: &[u8]) -> OrmResult<MultiRef>
    where
        S: ReadOnlyKvStore + ?Sized,
    {
        match store.get(&self.space.key(index_key))? {
            Some(bytes) => codec.decode(&bytes),
            None => Ok(MultiRef::default()),
        }
    }

    /// Queue the posting changes that move `pk` from `old` to `new`.
    ///
    /// Reads go to `store`; writes go to `batch` only. On error nothing has
    /// been written and the caller must drop the batch.
    pub(crate) fn stage_update<S>(
        &self,
        store: &S,
        codec: &Codec,
        batch: &mut dyn Batch,
        pk: &[u8],
        old: Option<&[u8]>,
        new: Option<&[u8]>,
    ) -> OrmResult<()>
    where
        S: ReadOnlyKvStore + ?Sized,
    {
        if old == new {
            return Ok(());
        }

        // Check the new posting first so a unique violation stages nothing.
        let added = match new {
            Some(new_key) => {
                let mut refs = self.refs(store, codec, new_key)?;
                if self.unique && refs.iter().any(|r| r != pk) {
                    return Err(OrmError::UniqueConstraintViolation {
                        index: self.name.clone(),
                        key: hex::encode(new_key),
                    });
                }
                if !refs.contains(pk) {
                    refs.add(pk.to_vec())?;
                }
                Some((new_key, refs))
            }
            None => None,
        };

        if let Some(old_key) = old {
            let mut refs = self.refs(store, codec, old_key)?;
            if refs.remove(pk).is_err() {
                warn!(
                    index = %self.name,
                    index_key = %hex::encode(old_key),
                    pk = %hex::encode(pk),
                    "posting list did not contain primary key"
                );
            } else {
                self.stage_refs(codec, batch, old_key, &refs)?;
            }
        }

        if let Some((new_key, refs)) = added {
            self.stage_refs(codec, batch, new_key, &refs)?;
        }
        Ok(())
    }

    // Empty posting lists are deleted rather than stored.
    fn stage_refs(
        &self,
        codec: &Codec,
        batch: &mut dyn Batch,
        index_key: &[u8],
        refs: &MultiRef,
    ) -> OrmResult<()> {
        let key = self.space.key(index_key);
        if refs.is_empty() {
            batch.delete(&key)?;
        } else {
            batch.set(&key, &codec.encode(refs)?)?;
        }
        Ok(())
    }
}
