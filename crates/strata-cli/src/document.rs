//! JSON documents as stored models, and indexes over their fields.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strata_orm::{model_indexer, Codec, Indexer, Model, OrmError, OrmResult};

/// Wire name documents are registered under.
pub const DOCUMENT_TYPE_NAME: &str = "strata/Document";

/// A JSON object kept in its compact text form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    body: String,
}

impl Document {
    /// Parse `text`, which must hold a JSON object.
    pub fn parse(text: &str) -> OrmResult<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| OrmError::Invalid(format!("document is not valid JSON: {e}")))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> OrmResult<Self> {
        if !value.is_object() {
            return Err(OrmError::Invalid("document must be a JSON object".into()));
        }
        Ok(Self {
            body: value.to_string(),
        })
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn value(&self) -> OrmResult<Value> {
        serde_json::from_str(&self.body).map_err(|e| OrmError::Serialization(e.to_string()))
    }

    /// Index key of the field at `pointer`.
    ///
    /// Strings index as their UTF-8 bytes, numbers and booleans as their
    /// JSON text. A missing or null field is not indexed; arrays and objects
    /// are rejected.
    pub fn field_key(&self, pointer: &str) -> OrmResult<Option<Vec<u8>>> {
        let value = self.value()?;
        match value.pointer(pointer) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_bytes().to_vec())),
            Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(v.to_string().into_bytes())),
            Some(_) => Err(OrmError::Invalid(format!(
                "field {pointer} must be a string, number or boolean to be indexed"
            ))),
        }
    }
}

impl Model for Document {
    fn validate(&self) -> OrmResult<()> {
        match self.value()? {
            Value::Object(_) => Ok(()),
            _ => Err(OrmError::Invalid("document must be a JSON object".into())),
        }
    }
}

/// Codec with [`Document`] registered.
pub fn codec() -> OrmResult<Arc<Codec>> {
    Ok(Arc::new(Codec::new().with_type::<Document>(DOCUMENT_TYPE_NAME)?))
}

/// Normalise a configured field into a JSON pointer (`name` becomes `/name`).
pub fn json_pointer(field: &str) -> String {
    if field.is_empty() || field.starts_with('/') {
        field.to_string()
    } else {
        format!("/{field}")
    }
}

/// Indexer over the document field at `field`.
pub fn field_indexer(field: &str) -> Indexer {
    let pointer = json_pointer(field);
    model_indexer(move |doc: &Document| doc.field_key(&pointer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_orm::Object;

    fn doc(text: &str) -> Document {
        Document::parse(text).unwrap()
    }

    #[test]
    fn parse_normalises_body() {
        let d = doc("{ \"a\" : 1 }");
        assert_eq!(d.body(), r#"{"a":1}"#);
        assert!(Model::validate(&d).is_ok());
    }

    #[test]
    fn parse_rejects_non_objects() {
        assert!(matches!(Document::parse("[1,2]"), Err(OrmError::Invalid(_))));
        assert!(matches!(Document::parse("not json"), Err(OrmError::Invalid(_))));
    }

    #[test]
    fn field_keys_by_type() {
        let d = doc(r#"{"name":"ann","age":41,"admin":true,"gone":null,"tags":["x"],"addr":{"city":"Oslo"}}"#);
        assert_eq!(d.field_key("/name").unwrap(), Some(b"ann".to_vec()));
        assert_eq!(d.field_key("/age").unwrap(), Some(b"41".to_vec()));
        assert_eq!(d.field_key("/admin").unwrap(), Some(b"true".to_vec()));
        assert_eq!(d.field_key("/addr/city").unwrap(), Some(b"Oslo".to_vec()));
        assert_eq!(d.field_key("/gone").unwrap(), None);
        assert_eq!(d.field_key("/missing").unwrap(), None);
        assert!(matches!(d.field_key("/tags"), Err(OrmError::Invalid(_))));
    }

    #[test]
    fn pointer_normalisation() {
        assert_eq!(json_pointer("name"), "/name");
        assert_eq!(json_pointer("/a/b"), "/a/b");
        assert_eq!(json_pointer(""), "");
    }

    #[test]
    fn indexer_reads_field() {
        let indexer = field_indexer("owner");
        let obj = Object::new(b"k".to_vec(), doc(r#"{"owner":"bob"}"#));
        assert_eq!(indexer(&obj).unwrap(), Some(b"bob".to_vec()));
    }

    #[test]
    fn codec_round_trip() {
        let codec = codec().unwrap();
        let d = doc(r#"{"x":"y"}"#);
        let bytes = codec.encode(&d).unwrap();
        assert_eq!(codec.decode::<Document>(&bytes).unwrap(), d);
    }
}
