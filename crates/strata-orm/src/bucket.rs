//! Object-level bucket engine with secondary index maintenance.

use std::collections::BTreeMap;
use std::sync::Arc;

use strata_kv::{KvStore, ReadOnlyKvStore};
use tracing::{debug, warn};

use crate::codec::Codec;
use crate::config::{BucketConfig, DanglingRefPolicy};
use crate::error::{OrmError, OrmResult};
use crate::index::{Index, Indexer};
use crate::keys::Keyspace;
use crate::model::{Model, ModelType};
use crate::multiref::MultiRef;
use crate::names::validate_name;
use crate::object::Object;
use crate::sequence::Sequence;

/// Stores objects of one model type and keeps their indexes consistent.
///
/// A bucket holds no data itself; every call takes the store it should act
/// on. The set of indexes is fixed once construction is finished.
#[derive(Clone, Debug)]
pub struct Bucket {
    name: String,
    model: ModelType,
    codec: Arc<Codec>,
    rows: Keyspace,
    indexes: BTreeMap<String, Index>,
    config: BucketConfig,
}

impl Bucket {
    /// Create a bucket for `M` named `name`.
    ///
    /// `M` must already be registered with `codec`.
    pub fn new<M: Model>(codec: Arc<Codec>, name: &str) -> OrmResult<Self> {
        validate_name(name)?;
        if !codec.is_registered::<M>() {
            return Err(OrmError::UnregisteredType(std::any::type_name::<M>().to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            model: ModelType::of::<M>(),
            codec,
            rows: Keyspace::rows(name),
            indexes: BTreeMap::new(),
            config: BucketConfig::default(),
        })
    }

    /// Register a secondary index.
    pub fn with_index(mut self, name: &str, indexer: Indexer, unique: bool) -> OrmResult<Self> {
        validate_name(name)?;
        if self.indexes.contains_key(name) {
            return Err(OrmError::DuplicateIndex(name.to_string()));
        }
        let index = Index::new(&self.name, name, indexer, unique);
        self.indexes.insert(name.to_string(), index);
        Ok(self)
    }

    pub fn with_config(mut self, config: BucketConfig) -> Self {
        self.config = config;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model_type(&self) -> ModelType {
        self.model
    }

    pub fn config(&self) -> &BucketConfig {
        &self.config
    }

    /// Registered index names in sorted order.
    pub fn index_names(&self) -> impl Iterator<Item = &str> {
        self.indexes.keys().map(String::as_str)
    }

    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.get(name)
    }

    /// A sequence scoped to this bucket.
    pub fn sequence(&self, name: &str) -> OrmResult<Sequence> {
        Sequence::scoped(&self.name, name)
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Store `obj` under its key and move it between index postings.
    ///
    /// The primary row and every posting change are written in one batch.
    /// Nothing is written if the payload is of the wrong type, fails
    /// validation, or would break a unique index.
    pub fn save<S>(&self, store: &S, obj: &Object) -> OrmResult<()>
    where
        S: KvStore + ?Sized,
    {
        self.model.check_payload(obj.value())?;
        obj.validate()?;

        let pk = obj.key();
        let prev = self.get(store, pk)?;
        let body = obj.value().encode(&self.codec)?;

        let mut batch = store.new_batch();
        batch.set(&self.rows.key(pk), &body)?;
        for index in self.indexes.values() {
            let old = index.index_key(prev.as_ref())?;
            let new = index.index_key(Some(obj))?;
            index.stage_update(
                store,
                &self.codec,
                batch.as_mut(),
                pk,
                old.as_deref(),
                new.as_deref(),
            )?;
        }
        let ops = batch.len();
        batch.write()?;

        debug!(
            bucket = %self.name,
            key = %hex::encode(pk),
            replaced = prev.is_some(),
            ops,
            "saved object"
        );
        Ok(())
    }

    /// Remove the row at `key` and its postings. Absent keys are a no-op.
    pub fn delete<S>(&self, store: &S, key: &[u8]) -> OrmResult<()>
    where
        S: KvStore + ?Sized,
    {
        let Some(prev) = self.get(store, key)? else {
            debug!(bucket = %self.name, key = %hex::encode(key), "delete of absent key");
            return Ok(());
        };

        let mut batch = store.new_batch();
        batch.delete(&self.rows.key(key))?;
        for index in self.indexes.values() {
            let old = index.index_key(Some(&prev))?;
            index.stage_update(store, &self.codec, batch.as_mut(), key, old.as_deref(), None)?;
        }
        let ops = batch.len();
        batch.write()?;

        debug!(bucket = %self.name, key = %hex::encode(key), ops, "deleted object");
        Ok(())
    }

    // ---------------------------------------------------------------
    // Lookup
    // ---------------------------------------------------------------

    /// Load the object at `key`, or `None` if there is no such row.
    pub fn get<S>(&self, store: &S, key: &[u8]) -> OrmResult<Option<Object>>
    where
        S: ReadOnlyKvStore + ?Sized,
    {
        match store.get(&self.rows.key(key))? {
            Some(bytes) => {
                let value = self.model.decode(&self.codec, &bytes)?;
                Ok(Some(Object::from_payload(key.to_vec(), value)))
            }
            None => Ok(None),
        }
    }

    pub fn has<S>(&self, store: &S, key: &[u8]) -> OrmResult<bool>
    where
        S: ReadOnlyKvStore + ?Sized,
    {
        Ok(store.has(&self.rows.key(key))?)
    }

    /// Raw posting list for `value` in `index`.
    pub fn index_refs<S>(&self, store: &S, index: &str, value: &[u8]) -> OrmResult<MultiRef>
    where
        S: ReadOnlyKvStore + ?Sized,
    {
        self.lookup_index(index)?.refs(store, &self.codec, value)
    }

    /// Every object whose `index` key equals `value`, in posting order.
    ///
    /// A posting entry without a primary row is handled per
    /// [`BucketConfig::dangling_refs`].
    pub fn get_indexed<S>(&self, store: &S, index: &str, value: &[u8]) -> OrmResult<Vec<Object>>
    where
        S: ReadOnlyKvStore + ?Sized,
    {
        let refs = self.index_refs(store, index, value)?;
        let mut found = Vec::with_capacity(refs.len());
        for pk in refs.iter() {
            match self.get(store, pk)? {
                Some(obj) => found.push(obj),
                None => match self.config.dangling_refs {
                    DanglingRefPolicy::Error => {
                        return Err(OrmError::DanglingReference {
                            index: index.to_string(),
                            key: hex::encode(pk),
                        });
                    }
                    DanglingRefPolicy::Skip => {
                        warn!(
                            bucket = %self.name,
                            index,
                            key = %hex::encode(pk),
                            "skipping posting entry without primary row"
                        );
                    }
                },
            }
        }
        Ok(found)
    }

    /// Every object whose primary key starts with `prefix`, in key order
    /// (descending when `reverse` is set).
    pub fn scan<S>(&self, store: &S, prefix: &[u8], reverse: bool) -> OrmResult<Vec<Object>>
    where
        S: ReadOnlyKvStore + ?Sized,
    {
        let (start, end) = self.rows.range(prefix);
        let iter = if reverse {
            store.reverse_iterator(Some(&start), end.as_deref())?
        } else {
            store.iterator(Some(&start), end.as_deref())?
        };

        let mut found = Vec::new();
        for (key, bytes) in iter {
            let Some(pk) = self.rows.strip(&key) else {
                continue;
            };
            let value = self.model.decode(&self.codec, &bytes)?;
            found.push(Object::from_payload(pk.to_vec(), value));
        }
        Ok(found)
    }

    fn lookup_index(&self, name: &str) -> OrmResult<&Index> {
        self.indexes
            .get(name)
            .ok_or_else(|| OrmError::InvalidIndex(name.to_string()))
    }
}
