//! Search engine boundary for searchdoc
//!
//! The store delegates indexing, storage and query evaluation to an engine
//! behind the `SearchEngine` trait. The engine owns its own concurrency
//! control; every method may be called from several threads at once.
//!
//! `TantivyEngine` is the engine collections run on: one tantivy index per
//! collection, BM25 relevance, analyzed full-text matching. `MemoryEngine` is
//! a BTreeMap-backed scan for tests.

mod errors;
mod expr;
mod index;
mod matcher;
mod memory;
mod query;
mod schema;
mod sorter;

pub use errors::{EngineError, EngineResult};
pub use expr::QueryExpr;
pub use index::TantivyEngine;
pub use memory::MemoryEngine;
pub use schema::build_document_schema;
pub use sorter::SortKey;

use std::collections::BTreeMap;
use std::time::Duration;

use crate::document::Document;

/// Field selector meaning "every stored field"
pub const ALL_FIELDS: &str = "*";

/// A single query submitted to an engine
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub expr: QueryExpr,
    pub offset: usize,
    pub size: usize,
    /// Sort keys, see `SortKey::parse`
    pub sort: Vec<String>,
    /// Stored fields to return; `"*"` for all
    pub fields: Vec<String>,
    /// Ask the engine for match locations
    pub include_locations: bool,
}

impl SearchRequest {
    pub fn new(expr: QueryExpr, offset: usize, size: usize) -> Self {
        Self {
            expr,
            offset,
            size,
            sort: Vec::new(),
            fields: vec![ALL_FIELDS.to_string()],
            include_locations: false,
        }
    }

    pub fn with_sort(mut self, sort: Vec<String>) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_locations(mut self) -> Self {
        self.include_locations = true;
        self
    }
}

/// One ranked document
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub id: String,
    pub fields: Document,
    pub score: f64,
    /// Byte size of the hit as measured by the engine
    pub size: u64,
    /// Position in the full ordered result set
    pub rank: u64,
    /// Field name to matched terms, when requested
    pub locations: BTreeMap<String, Vec<String>>,
}

/// Outcome of a query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    /// Matches regardless of pagination
    pub total: u64,
    pub hits: Vec<Hit>,
    pub took: Duration,
}

/// The capability the store drives
pub trait SearchEngine: Send + Sync {
    /// Inserts or overwrites the document stored under `id`
    fn index_document(&self, id: &str, fields: &Document) -> EngineResult<()>;

    /// Removes `id`; removing an absent id succeeds
    fn delete_document(&self, id: &str) -> EngineResult<()>;

    /// Evaluates, orders and paginates a query
    fn run_query(&self, request: &SearchRequest) -> EngineResult<SearchResponse>;
}
