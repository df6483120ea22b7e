//! In-memory search engine
//!
//! A `BTreeMap` of documents scanned on every query. Deterministic and
//! dependency free, for tests and embedding; `TantivyEngine` is the engine
//! collections are opened with.

use std::collections::BTreeMap;
use std::sync::RwLock;
use std::time::Instant;

use super::errors::{EngineError, EngineResult};
use super::matcher::evaluate;
use super::sorter::{self, Candidate, SortKey};
use super::{Hit, SearchEngine, SearchRequest, SearchResponse};
use crate::document::Document;

/// BTreeMap-backed engine
#[derive(Debug, Default)]
pub struct MemoryEngine {
    documents: RwLock<BTreeMap<String, Document>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.documents.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> EngineError {
    EngineError::Unavailable("document map lock poisoned".to_string())
}

impl SearchEngine for MemoryEngine {
    fn index_document(&self, id: &str, fields: &Document) -> EngineResult<()> {
        let mut documents = self.documents.write().map_err(|_| poisoned())?;
        documents.insert(id.to_string(), fields.clone());
        Ok(())
    }

    fn delete_document(&self, id: &str) -> EngineResult<()> {
        let mut documents = self.documents.write().map_err(|_| poisoned())?;
        documents.remove(id);
        Ok(())
    }

    fn run_query(&self, request: &SearchRequest) -> EngineResult<SearchResponse> {
        let started = Instant::now();
        let keys = request
            .sort
            .iter()
            .map(|k| SortKey::parse(k))
            .collect::<EngineResult<Vec<_>>>()?;

        let documents = self.documents.read().map_err(|_| poisoned())?;

        let mut candidates: Vec<Candidate<'_>> = documents
            .iter()
            .filter_map(|(id, doc)| {
                evaluate(&request.expr, id, doc).map(|score| Candidate {
                    id: id.as_str(),
                    doc,
                    score,
                })
            })
            .collect();
        sorter::sort(&mut candidates, &keys);

        let total = candidates.len() as u64;
        let mut hits = Vec::new();
        for (rank, candidate) in candidates
            .into_iter()
            .enumerate()
            .skip(request.offset)
            .take(request.size)
        {
            hits.push(Hit {
                id: candidate.id.to_string(),
                fields: candidate.doc.project(&request.fields),
                score: candidate.score,
                size: serde_json::to_vec(candidate.doc)?.len() as u64,
                rank: rank as u64,
                locations: BTreeMap::new(),
            });
        }

        Ok(SearchResponse {
            total,
            hits,
            took: started.elapsed(),
        })
    }
}
