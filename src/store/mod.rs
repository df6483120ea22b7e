//! Document store for searchdoc
//!
//! Upsert with merge semantics, point lookups, deletes, searches with joins,
//! and aggregation, all on top of a `SearchEngine`.
//!
//! # Write path (`put`)
//!
//! 1. Resolve or mint the `id`
//! 2. Load the stored document, if any
//! 3. Deep-merge the incoming fields on top
//! 4. Stamp `created_at` (once) and `updated_at` (every write)
//! 5. Overwrite the document in the engine
//!
//! # Concurrency
//!
//! The store holds no state besides configuration; the engine does its own
//! locking. Steps 2-5 are a read-modify-write: without `serialize_writes`,
//! two concurrent `put`s on one id are last-write-wins at the engine and one
//! caller's fields can be lost. With `serialize_writes`, `put`s on the same id
//! are serialized through striped locks.

mod aggregate;
mod errors;
mod join;
mod locks;
mod query;
mod search;

pub use aggregate::{AggregateFn, Aggregation};
pub use errors::{StoreError, StoreErrorCode, StoreResult};
pub use query::{Join, JoinFailure, JoinFailureReason, Query, SearchResult};

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::config::StoreConfig;
use crate::document::{
    deep_merge, now_nanos, Document, IdGenerator, UuidGenerator, CREATED_AT_FIELD, ID_FIELD,
    UPDATED_AT_FIELD,
};
use crate::engine::{QueryExpr, SearchEngine};
use crate::observability::{log_event, Event, MetricsRegistry};

use join::JoinTrail;
use locks::WriteLocks;

struct StoreInner {
    name: String,
    engine: Arc<dyn SearchEngine>,
    config: StoreConfig,
    ids: Arc<dyn IdGenerator>,
    metrics: Arc<MetricsRegistry>,
    locks: Option<WriteLocks>,
}

/// A named collection of documents backed by a search engine.
///
/// Cloning is cheap and yields a handle to the same collection.
#[derive(Clone)]
pub struct DocumentStore {
    inner: Arc<StoreInner>,
}

impl DocumentStore {
    /// Store with default configuration, UUID ids and private metrics
    pub fn new(name: impl Into<String>, engine: Arc<dyn SearchEngine>) -> Self {
        Self::builder(name, engine).build()
    }

    pub fn builder(name: impl Into<String>, engine: Arc<dyn SearchEngine>) -> StoreBuilder {
        StoreBuilder {
            name: name.into(),
            engine,
            config: StoreConfig::default(),
            ids: Arc::new(UuidGenerator),
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.inner.metrics
    }

    pub fn engine(&self) -> &Arc<dyn SearchEngine> {
        &self.inner.engine
    }

    /// Creates or updates a document and returns the merged result.
    ///
    /// A missing, null or empty `id` mints a new one; any other non-string
    /// `id` is rejected.
    pub fn put(&self, data: Document) -> StoreResult<Document> {
        let result = self.put_inner(data);
        if let Err(ref e) = result {
            self.inner.metrics.increment_put_failures();
            log_event(
                Event::DocumentPutFailed,
                &[("collection", self.name()), ("error", e.to_string().as_str())],
            );
        }
        result
    }

    fn put_inner(&self, mut data: Document) -> StoreResult<Document> {
        let now = now_nanos();

        let supplied = match data.get(ID_FIELD) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                return Err(StoreError::invalid_argument(format!(
                    "invalid id {}, it must be a string",
                    other
                )))
            }
        };

        let id = match supplied {
            Some(id) => id,
            None => {
                let id = self
                    .inner
                    .ids
                    .generate()
                    .map_err(StoreError::id_generation)?;
                if id.is_empty() {
                    return Err(StoreError::id_generation("generator returned an empty id"));
                }
                data.insert(ID_FIELD, id.clone());
                data.insert(CREATED_AT_FIELD, now);
                id
            }
        };

        data.strip_metadata();
        let _guard = self.inner.locks.as_ref().map(|locks| locks.lock(&id));

        let base = match self.lookup(&id)? {
            Some(mut existing) => {
                existing.strip_metadata();
                existing
            }
            None => Document::new(),
        };
        let created_at = base.timestamp(CREATED_AT_FIELD);
        let last_update = base.timestamp(UPDATED_AT_FIELD);

        let mut merged = deep_merge(base, data);
        merged.insert(ID_FIELD, id.clone());

        let created_at = created_at
            .or_else(|| merged.timestamp(CREATED_AT_FIELD))
            .unwrap_or(now);
        merged.insert(CREATED_AT_FIELD, created_at);

        let mut updated_at = now.max(created_at);
        if let Some(last) = last_update {
            if updated_at <= last {
                updated_at = last.saturating_add(1);
            }
        }
        merged.insert(UPDATED_AT_FIELD, updated_at);

        self.inner
            .engine
            .index_document(&id, &merged)
            .map_err(|e| StoreError::engine(format!("index of '{}' failed", id), e))?;

        self.inner.metrics.increment_puts();
        log_event(Event::DocumentPut, &[("collection", self.name()), ("id", id.as_str())]);
        Ok(merged)
    }

    /// Loads a document by id
    pub fn get(&self, id: &str) -> StoreResult<Document> {
        self.inner.metrics.increment_gets();
        match self.lookup(id)? {
            Some(doc) => Ok(doc),
            None => {
                self.inner.metrics.increment_get_misses();
                Err(StoreError::not_found(self.name(), id))
            }
        }
    }

    /// Single-result exact-id search
    fn lookup(&self, id: &str) -> StoreResult<Option<Document>> {
        let query = Query::new(QueryExpr::ids([id])).size(1);
        let result = self.search_within(&query, &mut JoinTrail::default())?;
        if result.totals < 1 {
            return Ok(None);
        }
        Ok(result.docs.into_iter().next())
    }

    /// Removes a document. Never fails: engine errors are logged and counted.
    pub fn delete(&self, id: &str) {
        match self.inner.engine.delete_document(id) {
            Ok(()) => {
                self.inner.metrics.increment_deletes();
                log_event(Event::DocumentDeleted, &[("collection", self.name()), ("id", id)]);
            }
            Err(e) => {
                self.inner.metrics.increment_delete_failures();
                log_event(
                    Event::DocumentDeleteFailed,
                    &[
                        ("collection", self.name()),
                        ("id", id),
                        ("error", e.to_string().as_str()),
                    ],
                );
            }
        }
    }
}

impl fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentStore")
            .field("name", &self.inner.name)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// Assembles a `DocumentStore`
pub struct StoreBuilder {
    name: String,
    engine: Arc<dyn SearchEngine>,
    config: StoreConfig,
    ids: Arc<dyn IdGenerator>,
    metrics: Arc<MetricsRegistry>,
}

impl StoreBuilder {
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Shares a metrics registry, e.g. across a catalog
    pub fn metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn build(self) -> DocumentStore {
        let locks = self
            .config
            .serialize_writes
            .then(|| WriteLocks::new(self.config.write_lock_stripes));
        DocumentStore {
            inner: Arc::new(StoreInner {
                name: self.name,
                engine: self.engine,
                config: self.config,
                ids: self.ids,
                metrics: self.metrics,
                locks,
            }),
        }
    }
}
