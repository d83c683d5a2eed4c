//! The record contract.
//!
//! Application types implement [`Model`]. The engine itself only sees
//! `dyn Payload`, the object-safe view every `Model` gets for free, and a
//! [`ModelType`] tag that says which concrete type a bucket holds.

use std::any::{Any, TypeId};
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::Codec;
use crate::error::{OrmError, OrmResult};

/// A record type that can be stored in a bucket.
pub trait Model: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static {
    /// Returns an error if the value is not in a state that may be stored
    /// (missing field, out of range, ...).
    fn validate(&self) -> OrmResult<()>;
}

/// Type-erased payload carried by an [`Object`](crate::Object).
pub trait Payload: Any + fmt::Debug + Send + Sync {
    /// Delegates to [`Model::validate`].
    fn validate(&self) -> OrmResult<()>;

    /// Encode through the codec under the type's registered name.
    fn encode(&self, codec: &Codec) -> OrmResult<Vec<u8>>;

    fn clone_payload(&self) -> Box<dyn Payload>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Rust type name of the concrete value.
    fn type_name(&self) -> &'static str;
}

impl<M: Model> Payload for M {
    fn validate(&self) -> OrmResult<()> {
        Model::validate(self)
    }

    fn encode(&self, codec: &Codec) -> OrmResult<Vec<u8>> {
        codec.encode(self)
    }

    fn clone_payload(&self) -> Box<dyn Payload> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<M>()
    }
}

impl Clone for Box<dyn Payload> {
    fn clone(&self) -> Self {
        self.clone_payload()
    }
}

type DecodeFn = fn(&Codec, &[u8]) -> OrmResult<Box<dyn Payload>>;

/// Runtime tag for the concrete model type a bucket was built for.
#[derive(Clone, Copy)]
pub struct ModelType {
    id: TypeId,
    name: &'static str,
    decode: DecodeFn,
}

impl ModelType {
    /// Tag for `M`.
    pub fn of<M: Model>() -> Self {
        Self {
            id: TypeId::of::<M>(),
            name: std::any::type_name::<M>(),
            decode: decode_payload::<M>,
        }
    }

    /// Rust type name of the tagged type.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` if `M` is the tagged type.
    pub fn is<M: Model>(&self) -> bool {
        self.id == TypeId::of::<M>()
    }

    /// Fails with `WrongType` unless `M` is the tagged type.
    pub fn check<M: Model>(&self) -> OrmResult<()> {
        if self.is::<M>() {
            Ok(())
        } else {
            Err(OrmError::wrong_type(self.name, std::any::type_name::<M>()))
        }
    }

    /// Fails with `WrongType` unless `value` is of the tagged type.
    pub fn check_payload(&self, value: &dyn Payload) -> OrmResult<()> {
        if value.as_any().type_id() == self.id {
            Ok(())
        } else {
            Err(OrmError::wrong_type(self.name, value.type_name()))
        }
    }

    /// Decode stored bytes into a boxed payload of the tagged type.
    pub fn decode(&self, codec: &Codec, bytes: &[u8]) -> OrmResult<Box<dyn Payload>> {
        (self.decode)(codec, bytes)
    }
}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelType").field(&self.name).finish()
    }
}

impl PartialEq for ModelType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ModelType {}

fn decode_payload<M: Model>(codec: &Codec, bytes: &[u8]) -> OrmResult<Box<dyn Payload>> {
    let value: M = codec.decode(bytes)?;
    Ok(Box::new(value))
}

/// Recover a concrete model from a boxed payload.
pub(crate) fn downcast_payload<M: Model>(value: Box<dyn Payload>) -> OrmResult<M> {
    let actual = value.type_name();
    value
        .into_any()
        .downcast::<M>()
        .map(|boxed| *boxed)
        .map_err(|_| OrmError::wrong_type(std::any::type_name::<M>(), actual))
}
