//! Typed convenience layer over [`Bucket`].

use std::sync::Arc;

use strata_kv::{KvStore, ReadOnlyKvStore};

use crate::bucket::Bucket;
use crate::codec::Codec;
use crate::config::BucketConfig;
use crate::error::{OrmError, OrmResult};
use crate::index::Indexer;
use crate::model::{downcast_payload, Model};
use crate::object::Object;
use crate::sequence::Sequence;

/// A [`Bucket`] driven with plain model values instead of [`Object`]s.
///
/// Unlike the raw bucket, absence is an error here: `one`, `delete` and
/// `has` fail with `NotFound` when the key has no row. Keys omitted on
/// `put` are allocated from a bucket-scoped [`Sequence`].
#[derive(Clone, Debug)]
pub struct ModelBucket {
    bucket: Bucket,
    id_seq: Sequence,
}

impl ModelBucket {
    /// Create a model bucket for `M` named `name`.
    pub fn new<M: Model>(codec: Arc<Codec>, name: &str) -> OrmResult<Self> {
        Self::from_bucket(Bucket::new::<M>(codec, name)?)
    }

    /// Wrap an already configured bucket.
    pub fn from_bucket(bucket: Bucket) -> OrmResult<Self> {
        let id_seq = bucket.sequence(&bucket.config().id_sequence)?;
        Ok(Self { bucket, id_seq })
    }

    pub fn with_index(self, name: &str, indexer: Indexer, unique: bool) -> OrmResult<Self> {
        Ok(Self {
            bucket: self.bucket.with_index(name, indexer, unique)?,
            id_seq: self.id_seq,
        })
    }

    /// Replace the bucket configuration. The key sequence follows
    /// `config.id_sequence`.
    pub fn with_config(self, config: BucketConfig) -> OrmResult<Self> {
        Self::from_bucket(self.bucket.with_config(config))
    }

    pub fn bucket(&self) -> &Bucket {
        &self.bucket
    }

    /// Sequence that hands out keys for `put` calls without one.
    pub fn id_sequence(&self) -> &Sequence {
        &self.id_seq
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Store `model` and return the key it was stored under.
    ///
    /// With no key (or an empty one) the next sequence value is used. The
    /// type and validation checks run first, so a rejected value consumes
    /// no sequence number.
    pub fn put<M, S>(&self, store: &S, key: Option<&[u8]>, model: M) -> OrmResult<Vec<u8>>
    where
        M: Model,
        S: KvStore + ?Sized,
    {
        self.bucket.model_type().check::<M>()?;
        Model::validate(&model)?;

        let key = match key {
            Some(key) if !key.is_empty() => key.to_vec(),
            _ => self.id_seq.next_val(store)?,
        };
        self.bucket.save(store, &Object::new(key.clone(), model))?;
        Ok(key)
    }

    /// Remove the row at `key`, failing with `NotFound` if there is none.
    pub fn delete<S>(&self, store: &S, key: &[u8]) -> OrmResult<()>
    where
        S: KvStore + ?Sized,
    {
        self.has(store, key)?;
        self.bucket.delete(store, key)
    }

    // ---------------------------------------------------------------
    // Lookup
    // ---------------------------------------------------------------

    /// Load the value at `key`.
    pub fn one<M, S>(&self, store: &S, key: &[u8]) -> OrmResult<M>
    where
        M: Model,
        S: ReadOnlyKvStore + ?Sized,
    {
        self.bucket.model_type().check::<M>()?;
        match self.bucket.get(store, key)? {
            Some(obj) => obj.into_value(),
            None => Err(OrmError::NotFound(hex::encode(key))),
        }
    }

    /// `Ok(())` if a row exists at `key`, `NotFound` otherwise.
    pub fn has<S>(&self, store: &S, key: &[u8]) -> OrmResult<()>
    where
        S: ReadOnlyKvStore + ?Sized,
    {
        if key.is_empty() {
            return Err(OrmError::NotFound("empty key".into()));
        }
        if self.bucket.has(store, key)? {
            Ok(())
        } else {
            Err(OrmError::NotFound(hex::encode(key)))
        }
    }

    /// Fill `dest` with every value whose `index` key equals `value` and
    /// return their primary keys in the same order.
    ///
    /// `dest` is cleared first. No match leaves it empty and returns no keys.
    pub fn by_index<M, S>(
        &self,
        store: &S,
        index: &str,
        value: &[u8],
        dest: &mut Vec<M>,
    ) -> OrmResult<Vec<Vec<u8>>>
    where
        M: Model,
        S: ReadOnlyKvStore + ?Sized,
    {
        self.bucket.model_type().check::<M>()?;
        let objs = self.bucket.get_indexed(store, index, value)?;

        let mut keys = Vec::with_capacity(objs.len());
        let mut values = Vec::with_capacity(objs.len());
        for obj in objs {
            let (key, payload) = obj.into_parts();
            values.push(downcast_payload::<M>(payload)?);
            keys.push(key);
        }
        dest.clear();
        dest.extend(values);
        Ok(keys)
    }

    /// [`ModelBucket::by_index`] for a destination of boxed values.
    pub fn by_index_boxed<M, S>(
        &self,
        store: &S,
        index: &str,
        value: &[u8],
        dest: &mut Vec<Box<M>>,
    ) -> OrmResult<Vec<Vec<u8>>>
    where
        M: Model,
        S: ReadOnlyKvStore + ?Sized,
    {
        let mut values = Vec::new();
        let keys = self.by_index(store, index, value, &mut values)?;
        dest.clear();
        dest.extend(values.into_iter().map(Box::new));
        Ok(keys)
    }

    /// Every stored value with its key, in key order.
    pub fn all<M, S>(&self, store: &S) -> OrmResult<Vec<(Vec<u8>, M)>>
    where
        M: Model,
        S: ReadOnlyKvStore + ?Sized,
    {
        self.bucket.model_type().check::<M>()?;
        self.bucket
            .scan(store, b"", false)?
            .into_iter()
            .map(|obj| {
                let (key, payload) = obj.into_parts();
                Ok((key, downcast_payload::<M>(payload)?))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::model_indexer;
    use crate::multiref::MultiRef;
    use crate::sequence::encode_sequence;
    use serde::{Deserialize, Serialize};
    use strata_kv::InMemoryKvStore;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Counter {
        count: i64,
    }

    impl Model for Counter {
        fn validate(&self) -> OrmResult<()> {
            if self.count < 0 {
                return Err(OrmError::Invalid("count must not be negative".into()));
            }
            Ok(())
        }
    }

    fn codec() -> Arc<Codec> {
        Arc::new(Codec::new().with_type::<Counter>("test/Counter").unwrap())
    }

    fn counters() -> ModelBucket {
        ModelBucket::new::<Counter>(codec(), "cnts").unwrap()
    }

    fn itob(n: u64) -> Vec<u8> {
        encode_sequence(n).to_vec()
    }

    // Indexes by thousands, ignoring anything below 1k.
    fn by_thousands() -> ModelBucket {
        counters()
            .with_index(
                "value",
                model_indexer(|c: &Counter| Ok(Some((c.count / 1000).to_string().into_bytes()))),
                false,
            )
            .unwrap()
    }

    // ---------------------------------------------------------------
    // Basic flow
    // ---------------------------------------------------------------

    #[test]
    fn put_one_delete() {
        let store = InMemoryKvStore::new();
        let b = counters();

        b.put(&store, Some(b"c1"), Counter { count: 1 }).unwrap();
        let c1: Counter = b.one(&store, b"c1").unwrap();
        assert_eq!(c1.count, 1);

        b.delete(&store, b"c1").unwrap();
        assert!(matches!(b.delete(&store, b"unknown"), Err(OrmError::NotFound(_))));
        assert!(matches!(b.one::<Counter, _>(&store, b"c1"), Err(OrmError::NotFound(_))));
    }

    #[test]
    fn put_overwrites() {
        let store = InMemoryKvStore::new();
        let b = counters();
        b.put(&store, Some(b"c1"), Counter { count: 1 }).unwrap();
        b.put(&store, Some(b"c1"), Counter { count: 2 }).unwrap();
        assert_eq!(b.one::<Counter, _>(&store, b"c1").unwrap().count, 2);
    }

    #[test]
    fn put_sequence() {
        let store = InMemoryKvStore::new();
        let b = counters();

        let key = b.put(&store, None, Counter { count: 111 }).unwrap();
        assert_eq!(key, itob(1));

        // An explicit key must not advance the sequence.
        b.put(&store, Some(b"mycnt"), Counter { count: 12345 }).unwrap();

        let key = b.put(&store, Some(b""), Counter { count: 222 }).unwrap();
        assert_eq!(key, itob(2));

        assert_eq!(b.one::<Counter, _>(&store, &itob(1)).unwrap().count, 111);
        assert_eq!(b.one::<Counter, _>(&store, &itob(2)).unwrap().count, 222);
        assert_eq!(b.id_sequence().current(&store).unwrap(), 2);
    }

    #[test]
    fn custom_id_sequence() {
        let store = InMemoryKvStore::new();
        let config = BucketConfig {
            id_sequence: "pk".into(),
            ..Default::default()
        };
        let b = counters().with_config(config).unwrap();
        b.put(&store, None, Counter { count: 1 }).unwrap();
        assert_eq!(b.id_sequence().key(), b"_s.cnts.pk");
        assert_eq!(store.get(b"_s.cnts.pk").unwrap(), Some(itob(1)));
    }

    #[test]
    fn all_lists_in_key_order() {
        let store = InMemoryKvStore::new();
        let b = counters();
        b.put(&store, Some(b"b"), Counter { count: 2 }).unwrap();
        b.put(&store, Some(b"a"), Counter { count: 1 }).unwrap();

        let all: Vec<(Vec<u8>, Counter)> = b.all(&store).unwrap();
        assert_eq!(
            all,
            vec![
                (b"a".to_vec(), Counter { count: 1 }),
                (b"b".to_vec(), Counter { count: 2 }),
            ]
        );
    }

    // ---------------------------------------------------------------
    // By index
    // ---------------------------------------------------------------

    fn seeded() -> (InMemoryKvStore, ModelBucket) {
        let store = InMemoryKvStore::new();
        let b = by_thousands();
        for count in [1001, 2001, 4001, 4002] {
            b.put(&store, None, Counter { count }).unwrap();
        }
        (store, b)
    }

    #[test]
    fn by_index_find_none() {
        let (store, b) = seeded();
        let mut dest = vec![Counter { count: 7 }];
        let keys = b.by_index(&store, "value", b"124089710947120", &mut dest).unwrap();
        assert!(keys.is_empty());
        assert!(dest.is_empty());
    }

    #[test]
    fn by_index_find_one() {
        let (store, b) = seeded();
        let mut dest: Vec<Counter> = Vec::new();
        let keys = b.by_index(&store, "value", b"1", &mut dest).unwrap();
        assert_eq!(keys, vec![itob(1)]);
        assert_eq!(dest, vec![Counter { count: 1001 }]);

        let mut boxed: Vec<Box<Counter>> = Vec::new();
        let keys = b.by_index_boxed(&store, "value", b"1", &mut boxed).unwrap();
        assert_eq!(keys, vec![itob(1)]);
        assert_eq!(boxed, vec![Box::new(Counter { count: 1001 })]);
    }

    #[test]
    fn by_index_find_two() {
        let (store, b) = seeded();
        let mut dest: Vec<Counter> = Vec::new();
        let keys = b.by_index(&store, "value", b"4", &mut dest).unwrap();
        assert_eq!(keys, vec![itob(3), itob(4)]);
        assert_eq!(dest, vec![Counter { count: 4001 }, Counter { count: 4002 }]);

        let mut boxed: Vec<Box<Counter>> = Vec::new();
        b.by_index_boxed(&store, "value", b"4", &mut boxed).unwrap();
        assert_eq!(boxed.len(), 2);
        assert_eq!(boxed[1].count, 4002);
    }

    #[test]
    fn by_index_unknown_index() {
        let (store, b) = seeded();
        let mut dest: Vec<Counter> = Vec::new();
        let err = b.by_index(&store, "xyz", b"1", &mut dest).unwrap_err();
        assert!(matches!(err, OrmError::InvalidIndex(_)));
    }

    // ---------------------------------------------------------------
    // Type checks
    // ---------------------------------------------------------------

    #[test]
    fn put_wrong_model_type() {
        let store = InMemoryKvStore::new();
        let b = counters();
        let refs = MultiRef::new([b"foo".to_vec()]).unwrap();
        let err = b.put(&store, None, refs).unwrap_err();
        assert!(matches!(err, OrmError::WrongType { .. }));
        // No sequence value was consumed.
        assert!(store.is_empty());
    }

    #[test]
    fn put_invalid_model_consumes_no_key() {
        let store = InMemoryKvStore::new();
        let b = counters();
        let err = b.put(&store, None, Counter { count: -1 }).unwrap_err();
        assert!(matches!(err, OrmError::Invalid(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn one_wrong_model_type() {
        let store = InMemoryKvStore::new();
        let b = counters();
        b.put(&store, Some(b"counter"), Counter { count: 1 }).unwrap();
        let err = b.one::<MultiRef, _>(&store, b"counter").unwrap_err();
        assert!(matches!(err, OrmError::WrongType { .. }));
    }

    #[test]
    fn by_index_wrong_model_type() {
        let store = InMemoryKvStore::new();
        let b = counters()
            .with_index("x", model_indexer(|_: &Counter| Ok(Some(b"x".to_vec()))), false)
            .unwrap();
        b.put(&store, Some(b"counter"), Counter { count: 1 }).unwrap();

        let mut refs: Vec<MultiRef> = Vec::new();
        assert!(matches!(
            b.by_index(&store, "x", b"x", &mut refs),
            Err(OrmError::WrongType { .. })
        ));

        let mut boxed: Vec<Box<MultiRef>> = Vec::new();
        assert!(matches!(
            b.by_index_boxed(&store, "x", b"x", &mut boxed),
            Err(OrmError::WrongType { .. })
        ));
    }

    // ---------------------------------------------------------------
    // Has
    // ---------------------------------------------------------------

    #[test]
    fn has() {
        let store = InMemoryKvStore::new();
        let b = counters();
        b.put(&store, Some(b"counter"), Counter { count: 1 }).unwrap();

        assert!(b.has(&store, b"counter").is_ok());
        assert!(matches!(b.has(&store, b""), Err(OrmError::NotFound(_))));
        assert!(matches!(b.has(&store, b"does-not-exist"), Err(OrmError::NotFound(_))));
    }
}
