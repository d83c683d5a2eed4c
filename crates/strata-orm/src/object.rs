use crate::error::{OrmError, OrmResult};
use crate::model::{downcast_payload, Model, Payload};

/// A primary key paired with a payload: the unit a [`Bucket`](crate::Bucket)
/// stores and returns.
///
/// An empty key is a valid "not yet assigned" placeholder, but such an object
/// cannot be saved.
#[derive(Clone, Debug)]
pub struct Object {
    key: Vec<u8>,
    value: Box<dyn Payload>,
}

impl Object {
    /// Wrap a model value under `key`.
    pub fn new<M: Model>(key: impl Into<Vec<u8>>, value: M) -> Self {
        Self {
            key: key.into(),
            value: Box::new(value),
        }
    }

    /// Wrap an already boxed payload under `key`.
    pub fn from_payload(key: impl Into<Vec<u8>>, value: Box<dyn Payload>) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn set_key(&mut self, key: impl Into<Vec<u8>>) {
        self.key = key.into();
    }

    pub fn value(&self) -> &dyn Payload {
        self.value.as_ref()
    }

    /// Borrow the payload as `M`, if that is its type.
    pub fn value_as<M: Model>(&self) -> Option<&M> {
        self.value.as_any().downcast_ref::<M>()
    }

    /// Take the payload out as `M`, failing with `WrongType` otherwise.
    pub fn into_value<M: Model>(self) -> OrmResult<M> {
        downcast_payload(self.value)
    }

    /// Split into key and boxed payload.
    pub fn into_parts(self) -> (Vec<u8>, Box<dyn Payload>) {
        (self.key, self.value)
    }

    /// Checks the key is set, then delegates to the payload's validation.
    pub fn validate(&self) -> OrmResult<()> {
        if self.key.is_empty() {
            return Err(OrmError::Empty("missing key".into()));
        }
        self.value.validate()
    }
}
