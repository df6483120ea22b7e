//! Request and result value types of the query layer

use std::fmt;

use serde::{Deserialize, Serialize};

use super::DocumentStore;
use crate::document::Document;
use crate::engine::QueryExpr;

/// A search request: expression, pagination, sort and joins
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Query {
    /// Underlying expression; absent matches every document
    #[serde(rename = "query", default, skip_serializing_if = "Option::is_none")]
    pub expr: Option<QueryExpr>,
    #[serde(default)]
    pub offset: usize,
    /// Page size; values below 1 fall back to the configured default
    #[serde(default)]
    pub size: usize,
    #[serde(default)]
    pub sort: Vec<String>,
    #[serde(rename = "join", default)]
    pub joins: Vec<Join>,
}

impl Query {
    pub fn new(expr: QueryExpr) -> Self {
        Self {
            expr: Some(expr),
            ..Self::default()
        }
    }

    /// Query matching every document
    pub fn all() -> Self {
        Self::default()
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn sort_by(mut self, key: impl Into<String>) -> Self {
        self.sort.push(key.into());
        self
    }

    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }
}

/// Replaces a foreign-key field with the documents it points at
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Join {
    /// Store the foreign keys live in; the searching store when absent
    #[serde(skip)]
    pub source: Option<DocumentStore>,
    /// Collection name bound to `source` through a catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Field holding the foreign key
    #[serde(default)]
    pub on: String,
    /// Field receiving the embedded documents
    #[serde(rename = "as", default)]
    pub as_: String,
    /// Template for the sub-query
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub where_: Option<Box<Query>>,
}

impl Join {
    pub fn new(on: impl Into<String>, as_: impl Into<String>) -> Self {
        Self {
            on: on.into(),
            as_: as_.into(),
            ..Self::default()
        }
    }

    pub fn source(mut self, store: &DocumentStore) -> Self {
        self.source = Some(store.clone());
        self
    }

    pub fn from_collection(mut self, name: impl Into<String>) -> Self {
        self.from = Some(name.into());
        self
    }

    pub fn where_query(mut self, template: Query) -> Self {
        self.where_ = Some(Box::new(template));
        self
    }
}

impl fmt::Debug for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Join")
            .field("source", &self.source.as_ref().map(DocumentStore::name))
            .field("from", &self.from)
            .field("on", &self.on)
            .field("as", &self.as_)
            .field("where", &self.where_)
            .finish()
    }
}

/// Why a join was not applied to a document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum JoinFailureReason {
    /// The sub-query failed at the engine
    Engine(String),
    /// The `on` value is neither a string nor an array of strings
    InvalidForeignKey,
    /// The foreign key points back at a document already on the join path
    Cycle(String),
    /// Nesting exceeded the configured maximum
    DepthExceeded(usize),
    /// `from` names a collection no store was bound for
    UnboundSource(String),
}

impl fmt::Display for JoinFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinFailureReason::Engine(msg) => write!(f, "engine: {}", msg),
            JoinFailureReason::InvalidForeignKey => write!(f, "invalid foreign key"),
            JoinFailureReason::Cycle(id) => write!(f, "cycle through '{}'", id),
            JoinFailureReason::DepthExceeded(depth) => write!(f, "depth {} exceeded", depth),
            JoinFailureReason::UnboundSource(name) => write!(f, "unbound source '{}'", name),
        }
    }
}

/// A join that was skipped while shaping a result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinFailure {
    pub collection: String,
    pub document_id: Option<String>,
    pub on: String,
    #[serde(rename = "as")]
    pub as_: String,
    pub reason: JoinFailureReason,
}

/// Shaped output of a search
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResult {
    /// Matches regardless of pagination
    pub totals: u64,
    pub docs: Vec<Document>,
    /// Engine time in nanoseconds
    pub time: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub join_failures: Vec<JoinFailure>,
}

impl SearchResult {
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_from_json() {
        let query: Query = serde_json::from_value(json!({
            "query": {"type": "term", "field": "kind", "value": "post"},
            "size": 5,
            "sort": ["-created_at"],
            "join": [{"on": "author", "as": "authors", "from": "users"}]
        }))
        .unwrap();

        assert_eq!(query.expr, Some(QueryExpr::term("kind", "post")));
        assert_eq!(query.offset, 0);
        assert_eq!(query.size, 5);
        assert_eq!(query.sort, vec!["-created_at".to_string()]);
        assert_eq!(query.joins.len(), 1);
        assert_eq!(query.joins[0].on, "author");
        assert_eq!(query.joins[0].as_, "authors");
        assert_eq!(query.joins[0].from.as_deref(), Some("users"));
        assert!(query.joins[0].source.is_none());
        assert!(query.joins[0].where_.is_none());
    }

    #[test]
    fn test_empty_json_is_match_all() {
        let query: Query = serde_json::from_value(json!({})).unwrap();
        assert!(query.expr.is_none());
        assert_eq!(query.size, 0);
        assert!(query.joins.is_empty());
    }

    #[test]
    fn test_nested_where() {
        let query: Query = serde_json::from_value(json!({
            "join": [{"on": "a", "as": "b", "where": {"size": 3, "sort": ["x"]}}]
        }))
        .unwrap();
        let template = query.joins[0].where_.as_ref().unwrap();
        assert_eq!(template.size, 3);
        assert_eq!(template.sort, vec!["x".to_string()]);
    }

    #[test]
    fn test_result_serialization_hides_empty_failures() {
        let result = SearchResult {
            totals: 0,
            docs: vec![],
            time: 12,
            join_failures: vec![],
        };
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"totals": 0, "docs": [], "time": 12})
        );
    }

    #[test]
    fn test_failure_serialization() {
        let failure = JoinFailure {
            collection: "posts".into(),
            document_id: Some("p1".into()),
            on: "author".into(),
            as_: "authors".into(),
            reason: JoinFailureReason::Cycle("p1".into()),
        };
        let value = serde_json::to_value(&failure).unwrap();
        assert_eq!(value["as"], "authors");
        assert_eq!(value["reason"], json!({"kind": "cycle", "detail": "p1"}));
    }
}
