//! Explicit type registry and binary codec for stored values.
//!
//! Every stored value is wrapped in an envelope carrying the wire name its
//! type was registered under:
//!
//! ```text
//! bincode(Envelope { name: "app/Counter", body: bincode(value) })
//! ```
//!
//! The name makes rows self-describing, so decoding a row as the wrong type
//! fails with `WrongType` instead of producing garbage.

use std::any::TypeId;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{OrmError, OrmResult};
use crate::model::Model;
use crate::multiref::MultiRef;

/// Wire name [`MultiRef`] is registered under by [`Codec::new`].
pub const MULTIREF_TYPE_NAME: &str = "strata/MultiRef";

#[derive(Serialize, Deserialize)]
struct Envelope {
    name: String,
    body: Vec<u8>,
}

/// Registry binding model types to stable wire names.
///
/// Built once, then shared (usually as `Arc<Codec>`) by every bucket that
/// stores through it.
#[derive(Clone, Debug)]
pub struct Codec {
    names: HashMap<TypeId, String>,
    types: HashMap<String, TypeId>,
}

impl Codec {
    /// Create a codec with the engine's own types registered.
    pub fn new() -> Self {
        let mut codec = Self {
            names: HashMap::new(),
            types: HashMap::new(),
        };
        codec.insert::<MultiRef>(MULTIREF_TYPE_NAME.to_string());
        codec
    }

    /// Register `M` under `name`.
    ///
    /// Registering the same type under the same name again is a no-op. A name
    /// already bound to another type, or a type already bound to another name,
    /// is rejected.
    pub fn register<M: Model>(&mut self, name: impl Into<String>) -> OrmResult<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(OrmError::Registration("type name must not be empty".into()));
        }
        let id = TypeId::of::<M>();
        if let Some(existing) = self.names.get(&id) {
            if *existing == name {
                return Ok(());
            }
            return Err(OrmError::Registration(format!(
                "{} is already registered as {existing:?}",
                std::any::type_name::<M>()
            )));
        }
        if self.types.contains_key(&name) {
            return Err(OrmError::Registration(format!(
                "name {name:?} is already bound to another type"
            )));
        }
        self.insert::<M>(name);
        Ok(())
    }

    /// Builder form of [`Codec::register`].
    pub fn with_type<M: Model>(mut self, name: impl Into<String>) -> OrmResult<Self> {
        self.register::<M>(name)?;
        Ok(self)
    }

    /// Wire name `M` is registered under, if any.
    pub fn name_of<M: Model>(&self) -> Option<&str> {
        self.names.get(&TypeId::of::<M>()).map(String::as_str)
    }

    /// Returns `true` if `M` has been registered.
    pub fn is_registered<M: Model>(&self) -> bool {
        self.names.contains_key(&TypeId::of::<M>())
    }

    /// Encode `value` inside a named envelope.
    pub fn encode<M: Model>(&self, value: &M) -> OrmResult<Vec<u8>> {
        let name = self.require_name::<M>()?;
        let body = bincode::serialize(value).map_err(|e| OrmError::Serialization(e.to_string()))?;
        let envelope = Envelope {
            name: name.to_string(),
            body,
        };
        bincode::serialize(&envelope).map_err(|e| OrmError::Serialization(e.to_string()))
    }

    /// Decode bytes produced by [`Codec::encode`] as `M`.
    pub fn decode<M: Model>(&self, bytes: &[u8]) -> OrmResult<M> {
        let expected = self.require_name::<M>()?;
        let envelope: Envelope =
            bincode::deserialize(bytes).map_err(|e| OrmError::Serialization(e.to_string()))?;
        if envelope.name != expected {
            return Err(OrmError::wrong_type(expected, envelope.name));
        }
        bincode::deserialize(&envelope.body).map_err(|e| OrmError::Serialization(e.to_string()))
    }

    fn require_name<M: Model>(&self) -> OrmResult<&str> {
        self.name_of::<M>()
            .ok_or_else(|| OrmError::UnregisteredType(std::any::type_name::<M>().to_string()))
    }

    fn insert<M: Model>(&mut self, name: String) {
        self.types.insert(name.clone(), TypeId::of::<M>());
        self.names.insert(TypeId::of::<M>(), name);
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Counter {
        count: i64,
    }

    impl Model for Counter {
        fn validate(&self) -> OrmResult<()> {
            Ok(())
        }
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Label {
        text: String,
    }

    impl Model for Label {
        fn validate(&self) -> OrmResult<()> {
            Ok(())
        }
    }

    fn codec() -> Codec {
        Codec::new().with_type::<Counter>("test/Counter").unwrap()
    }

    #[test]
    fn multiref_is_preregistered() {
        let codec = Codec::new();
        assert!(codec.is_registered::<MultiRef>());
        assert_eq!(codec.name_of::<MultiRef>(), Some(MULTIREF_TYPE_NAME));
    }

    #[test]
    fn encode_decode_registered_type() {
        let codec = codec();
        let bytes = codec.encode(&Counter { count: -7 }).unwrap();
        let back: Counter = codec.decode(&bytes).unwrap();
        assert_eq!(back, Counter { count: -7 });
    }

    #[test]
    fn unregistered_type_fails_both_ways() {
        let codec = codec();
        let err = codec.encode(&Label { text: "x".into() }).unwrap_err();
        assert!(matches!(err, OrmError::UnregisteredType(_)));

        let bytes = codec.encode(&Counter { count: 1 }).unwrap();
        let err = codec.decode::<Label>(&bytes).unwrap_err();
        assert!(matches!(err, OrmError::UnregisteredType(_)));
    }

    #[test]
    fn decoding_as_other_registered_type_is_wrong_type() {
        let codec = codec().with_type::<Label>("test/Label").unwrap();
        let bytes = codec.encode(&Counter { count: 1 }).unwrap();
        match codec.decode::<Label>(&bytes).unwrap_err() {
            OrmError::WrongType { expected, actual } => {
                assert_eq!(expected, "test/Label");
                assert_eq!(actual, "test/Counter");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn corrupt_bytes_fail_to_decode() {
        let codec = codec();
        let err = codec.decode::<Counter>(&[0xff, 0x01, 0x02]).unwrap_err();
        assert!(matches!(err, OrmError::Serialization(_)));
    }

    #[test]
    fn reregistering_same_name_is_noop() {
        let mut codec = codec();
        codec.register::<Counter>("test/Counter").unwrap();
        assert_eq!(codec.name_of::<Counter>(), Some("test/Counter"));
    }

    #[test]
    fn conflicting_registrations_are_rejected() {
        let mut codec = codec();
        assert!(matches!(
            codec.register::<Counter>("test/Other"),
            Err(OrmError::Registration(_))
        ));
        assert!(matches!(
            codec.register::<Label>("test/Counter"),
            Err(OrmError::Registration(_))
        ));
        assert!(matches!(
            codec.register::<Label>(""),
            Err(OrmError::Registration(_))
        ));
    }
}
