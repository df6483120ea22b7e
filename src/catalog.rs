//! Named collections
//!
//! A catalog hands out one `DocumentStore` per collection name, all sharing
//! the same `StoreConfig` and `MetricsRegistry`. Collections are created on
//! first use. Every collection is a tantivy index: in RAM, or in the
//! `<dir>/<name>/` directory for a catalog opened on a directory.
//!
//! Joins in serialized queries name their source by collection (`from`);
//! `bind` resolves those names to stores before searching.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::{IndexConfig, StoreConfig};
use crate::engine::TantivyEngine;
use crate::observability::{log_event, Event, MetricsRegistry};
use crate::store::{DocumentStore, Query, StoreError, StoreResult};

#[derive(Debug)]
pub struct Catalog {
    config: StoreConfig,
    index: IndexConfig,
    data_dir: Option<PathBuf>,
    stores: RwLock<BTreeMap<String, DocumentStore>>,
    metrics: Arc<MetricsRegistry>,
}

impl Catalog {
    /// Catalog whose collections live in memory only
    pub fn in_memory(config: StoreConfig) -> Self {
        Self {
            config,
            index: IndexConfig::default(),
            data_dir: None,
            stores: RwLock::new(BTreeMap::new()),
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    /// Catalog keeping each collection's index under `data_dir`
    pub fn open(data_dir: impl Into<PathBuf>, config: StoreConfig) -> Self {
        Self {
            data_dir: Some(data_dir.into()),
            ..Self::in_memory(config)
        }
    }

    /// Index settings for collections opened from now on
    pub fn with_index_config(mut self, index: IndexConfig) -> Self {
        self.index = index;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Returns the store of `name`, opening it on first use
    pub fn store(&self, name: &str) -> StoreResult<DocumentStore> {
        validate_name(name)?;

        if let Some(store) = self
            .stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Ok(store.clone());
        }

        let mut stores = self.stores.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(store) = stores.get(name) {
            return Ok(store.clone());
        }

        let engine = match &self.data_dir {
            Some(dir) => TantivyEngine::open(dir.join(name), &self.index),
            None => TantivyEngine::in_ram(&self.index),
        }
        .map_err(|e| StoreError::engine(format!("cannot open collection '{}'", name), e))?;

        let store = DocumentStore::builder(name, Arc::new(engine))
            .config(self.config.clone())
            .metrics(Arc::clone(&self.metrics))
            .build();
        stores.insert(name.to_string(), store.clone());

        log_event(Event::CollectionOpened, &[("collection", name)]);
        Ok(store)
    }

    /// Names of the collections opened so far
    pub fn names(&self) -> Vec<String> {
        self.stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Binds every join naming a `from` collection to that collection's store.
    ///
    /// Joins inside `where` templates are left alone: sub-queries always run
    /// with the parent's joins, never the template's.
    pub fn bind(&self, query: &mut Query) -> StoreResult<()> {
        for join in query.joins.iter_mut() {
            if join.source.is_none() {
                if let Some(name) = &join.from {
                    join.source = Some(self.store(name)?);
                }
            }
        }
        Ok(())
    }
}

/// Collection names become directory names: letters, digits, `_` and `-` only
fn validate_name(name: &str) -> StoreResult<()> {
    if name.is_empty() {
        return Err(StoreError::invalid_argument("collection name must not be empty"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(StoreError::invalid_argument(format!(
            "invalid collection name '{}'",
            name
        )));
    }
    Ok(())
}
