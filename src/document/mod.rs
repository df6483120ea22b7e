//! Document model for searchdoc
//!
//! A document is a schema-free mapping from field name to a closed JSON value.
//!
//! # Reserved fields
//!
//! - `id`: non-empty string primary key
//! - `created_at`: nanosecond timestamp, set once
//! - `updated_at`: nanosecond timestamp, set on every write
//!
//! Search results additionally carry `_score`, `_size` and `_offset`. These are
//! result metadata and never persist.

mod ids;
mod merge;

pub use ids::{now_nanos, IdGenerator, UuidGenerator};
pub use merge::deep_merge;

use std::ops::Index;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Primary key field
pub const ID_FIELD: &str = "id";
/// Creation timestamp field
pub const CREATED_AT_FIELD: &str = "created_at";
/// Last-write timestamp field
pub const UPDATED_AT_FIELD: &str = "updated_at";
/// Relevance score injected into search hits
pub const SCORE_FIELD: &str = "_score";
/// Engine-reported byte size injected into search hits
pub const SIZE_FIELD: &str = "_size";
/// Absolute rank injected into search hits
pub const OFFSET_FIELD: &str = "_offset";

/// Fields injected by the query composer
pub const METADATA_FIELDS: [&str; 3] = [SCORE_FIELD, SIZE_FIELD, OFFSET_FIELD];

/// A schema-free document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Creates an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a document from a JSON value. Returns None unless the value is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Returns the `id` field when it is a string
    pub fn id(&self) -> Option<&str> {
        self.0.get(ID_FIELD).and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Returns an integer timestamp field, if present and integral
    pub fn timestamp(&self, field: &str) -> Option<i64> {
        self.0.get(field).and_then(Value::as_i64)
    }

    /// Drops `_score`, `_size` and `_offset`
    pub fn strip_metadata(&mut self) {
        for field in METADATA_FIELDS {
            self.0.remove(field);
        }
    }

    /// Keeps only the named fields. `"*"` keeps everything.
    pub fn project(&self, fields: &[String]) -> Document {
        if fields.is_empty() || fields.iter().any(|f| f == "*") {
            return self.clone();
        }
        let mut out = Map::new();
        for field in fields {
            if let Some(value) = self.0.get(field) {
                out.insert(field.clone(), value.clone());
            }
        }
        Document(out)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        doc.into_value()
    }
}

/// Missing fields index as `Value::Null`, like `serde_json::Value`
impl Index<&str> for Document {
    type Output = Value;

    fn index(&self, field: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.0.get(field).unwrap_or(&NULL)
    }
}
