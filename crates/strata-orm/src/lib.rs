//! Secondary-indexed object buckets for Strata.
//!
//! A [`Bucket`] stores records of one [`Model`] type under primary keys and
//! keeps any number of secondary indexes in step with them. Each index maps
//! a derived lookup key to a [`MultiRef`] posting list of primary keys. A
//! [`ModelBucket`] layers typed convenience operations on top, including
//! primary keys allocated from a [`Sequence`].
//!
//! # Key Types
//!
//! - [`Codec`] -- explicit registry binding model types to wire names
//! - [`Model`] / [`Payload`] -- the record contract and its type-erased form
//! - [`Object`] -- a primary key paired with a payload
//! - [`MultiRef`] -- sorted, deduplicated posting list
//! - [`Sequence`] -- persistent monotonic counter
//! - [`Bucket`] -- object-level engine with index maintenance
//! - [`ModelBucket`] -- typed wrapper over [`Bucket`]
//!
//! # Consistency
//!
//! Every `save` and `delete` computes the old and new index keys of the
//! record, diffs them, and queues the primary row plus every posting-list
//! change in a single store batch. Either all of them land or none do.

pub mod bucket;
pub mod codec;
pub mod config;
pub mod error;
pub mod index;
pub mod keys;
pub mod model;
pub mod model_bucket;
pub mod multiref;
pub mod names;
pub mod object;
pub mod sequence;

pub use bucket::Bucket;
pub use codec::Codec;
pub use config::{BucketConfig, DanglingRefPolicy};
pub use error::{OrmError, OrmResult};
pub use index::{model_indexer, Index, Indexer};
pub use model::{Model, ModelType, Payload};
pub use model_bucket::ModelBucket;
pub use multiref::MultiRef;
pub use names::validate_name;
pub use object::Object;
pub use sequence::{decode_sequence, encode_sequence, Sequence};
