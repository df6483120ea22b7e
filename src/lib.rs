//! searchdoc - a document store over a pluggable search engine
//!
//! - `put` merges partial updates into stored documents
//! - `search` annotates hits and resolves joins across collections
//! - `aggregate` computes count, sum and avg over whole result sets
//!
//! ```ignore
//! use std::sync::Arc;
//! use searchdoc::{DocumentStore, IndexConfig, Join, Query, TantivyEngine};
//!
//! let users = DocumentStore::new("users", Arc::new(TantivyEngine::in_ram(&IndexConfig::default())?));
//! let posts = DocumentStore::new("posts", Arc::new(TantivyEngine::in_ram(&IndexConfig::default())?));
//!
//! let query = Query::all().join(Join::new("author", "authors").source(&users));
//! let result = posts.search(&query)?;
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod document;
pub mod engine;
pub mod observability;
pub mod store;

pub use catalog::Catalog;
pub use config::{Config, IndexConfig, JoinFailureMode, StoreConfig};
pub use document::{Document, IdGenerator};
pub use engine::{EngineError, MemoryEngine, QueryExpr, SearchEngine, TantivyEngine};
pub use store::{
    AggregateFn, Aggregation, DocumentStore, Join, JoinFailure, JoinFailureReason, Query,
    SearchResult, StoreError, StoreErrorCode, StoreResult,
};
