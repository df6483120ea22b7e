//! Tantivy schema for schemaless JSON documents
//!
//! Every document is indexed five ways:
//! - `_id`: primary key, raw and stored
//! - `_source`: the document's JSON encoding, stored only
//! - `_text`: the document as a JSON field, tokenized for `match`
//! - `_exact`: the document as a JSON field, untokenized for `term`
//! - `_all`: every string value, tokenized for `match` without a field

use serde_json::{Map, Value};
use tantivy::schema::{Field, Schema, TextOptions, Value as _, STRING, STORED, TEXT};
use tantivy::{DocAddress, Searcher, TantivyDocument};

use super::errors::{EngineError, EngineResult};
use crate::document::Document;

pub(super) const ID: &str = "_id";
pub(super) const SOURCE: &str = "_source";
pub(super) const TEXT_BODY: &str = "_text";
pub(super) const EXACT_BODY: &str = "_exact";
pub(super) const ALL_TEXT: &str = "_all";

/// Build the document schema
pub fn build_document_schema() -> Schema {
    let mut schema_builder = Schema::builder();

    schema_builder.add_text_field(ID, STRING | STORED);
    schema_builder.add_text_field(SOURCE, TextOptions::default().set_stored());
    schema_builder.add_json_field(TEXT_BODY, TEXT);
    schema_builder.add_json_field(EXACT_BODY, STRING);
    schema_builder.add_text_field(ALL_TEXT, TEXT);

    schema_builder.build()
}

/// Handles of the schema fields
#[derive(Debug, Clone, Copy)]
pub(super) struct DocumentFields {
    pub id: Field,
    pub source: Field,
    pub text: Field,
    pub exact: Field,
    pub all: Field,
}

impl DocumentFields {
    pub fn from_schema(schema: &Schema) -> EngineResult<Self> {
        Ok(Self {
            id: schema.get_field(ID)?,
            source: schema.get_field(SOURCE)?,
            text: schema.get_field(TEXT_BODY)?,
            exact: schema.get_field(EXACT_BODY)?,
            all: schema.get_field(ALL_TEXT)?,
        })
    }
}

/// Converts a document into its indexed form
pub(super) fn to_tantivy_doc(
    schema: &Schema,
    id: &str,
    fields: &Document,
) -> EngineResult<TantivyDocument> {
    let source = serde_json::to_string(fields)?;
    let body = Value::Object(fields.as_map().clone());

    let mut leaves = Vec::new();
    for (name, value) in fields.fields() {
        string_leaves(name, value, &mut leaves);
    }
    let all: Vec<Value> = leaves
        .into_iter()
        .map(|(_, text)| Value::String(text.to_string()))
        .collect();

    let mut indexed = Map::new();
    indexed.insert(ID.to_string(), Value::String(id.to_string()));
    indexed.insert(SOURCE.to_string(), Value::String(source));
    indexed.insert(TEXT_BODY.to_string(), body.clone());
    indexed.insert(EXACT_BODY.to_string(), body);
    indexed.insert(ALL_TEXT.to_string(), Value::Array(all));

    TantivyDocument::parse_json(schema, &Value::Object(indexed).to_string())
        .map_err(|e| EngineError::Index(format!("cannot index '{}': {}", id, e)))
}

/// A document read back from the index
#[derive(Debug, Clone)]
pub(super) struct StoredDoc {
    pub id: String,
    pub doc: Document,
    /// Length of the stored JSON encoding
    pub size: u64,
}

pub(super) fn read_stored(
    searcher: &Searcher,
    fields: &DocumentFields,
    address: DocAddress,
) -> EngineResult<StoredDoc> {
    let stored: TantivyDocument = searcher.doc(address)?;

    let source = stored
        .get_first(fields.source)
        .and_then(|v| v.as_str())
        .ok_or_else(|| EngineError::Index("stored document has no source".to_string()))?;
    let id = stored
        .get_first(fields.id)
        .and_then(|v| v.as_str())
        .ok_or_else(|| EngineError::Index("stored document has no id".to_string()))?;

    Ok(StoredDoc {
        id: id.to_string(),
        doc: serde_json::from_str(source)?,
        size: source.len() as u64,
    })
}

/// Collects every string under `value`, labelled with the top-level field
pub(super) fn string_leaves<'a>(
    name: &'a str,
    value: &'a Value,
    out: &mut Vec<(&'a str, &'a str)>,
) {
    match value {
        Value::String(text) => out.push((name, text)),
        Value::Array(items) => {
            for item in items {
                string_leaves(name, item, out);
            }
        }
        Value::Object(map) => {
            for child in map.values() {
                string_leaves(name, child, out);
            }
        }
        _ => {}
    }
}
