//! Tantivy-backed search engine
//!
//! One tantivy index per collection, either in a directory or in RAM. Every
//! mutation is committed and the reader reloaded before returning, so a `put`
//! is visible to the next lookup. Scores are tantivy's BM25.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use tantivy::collector::{Count, TopDocs};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, Term};

use super::errors::{EngineError, EngineResult};
use super::query::QueryBuilder;
use super::schema::{build_document_schema, read_stored, to_tantivy_doc, DocumentFields};
use super::sorter::{self, Candidate, SortKey};
use super::{Hit, SearchEngine, SearchRequest, SearchResponse};
use crate::config::IndexConfig;
use crate::document::Document;

/// Search engine over a tantivy index
pub struct TantivyEngine {
    /// The tantivy index
    index: Index,

    /// Handles of the schema fields
    fields: DocumentFields,

    /// Single writer; mutations are serialized through it
    writer: Mutex<IndexWriter>,

    /// Reloaded after every commit
    reader: IndexReader,

    /// Index directory, `None` in RAM
    path: Option<PathBuf>,
}

impl TantivyEngine {
    /// Create an index living in memory only
    pub fn in_ram(config: &IndexConfig) -> EngineResult<Self> {
        let index = Index::create_in_ram(build_document_schema());
        Self::with_index(index, None, config)
    }

    /// Open the index in `path`, creating it when the directory holds none
    pub fn open(path: impl AsRef<Path>, config: &IndexConfig) -> EngineResult<Self> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;

        let index = if Self::index_exists(&path) {
            Index::open_in_dir(&path)?
        } else {
            Index::create_in_dir(&path, build_document_schema())?
        };
        Self::with_index(index, Some(path), config)
    }

    fn with_index(index: Index, path: Option<PathBuf>, config: &IndexConfig) -> EngineResult<Self> {
        let fields = DocumentFields::from_schema(&index.schema())?;
        let writer = index.writer_with_num_threads(1, config.writer_heap_size)?;
        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        Ok(Self {
            index,
            fields,
            writer: Mutex::new(writer),
            reader,
            path,
        })
    }

    /// Check if an index exists at the given path
    fn index_exists(path: &Path) -> bool {
        path.join("meta.json").exists()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of live documents
    pub fn len(&self) -> usize {
        self.reader.searcher().num_docs() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Commits pending operations, or drops them all when the commit fails
    fn commit(&self, writer: &mut IndexWriter) -> EngineResult<()> {
        if let Err(e) = writer.commit() {
            let _ = writer.rollback();
            return Err(e.into());
        }
        self.reader.reload()?;
        Ok(())
    }

    fn id_term(&self, id: &str) -> Term {
        Term::from_field_text(self.fields.id, id)
    }
}

fn poisoned() -> EngineError {
    EngineError::Unavailable("index writer lock poisoned".to_string())
}

impl SearchEngine for TantivyEngine {
    fn index_document(&self, id: &str, fields: &Document) -> EngineResult<()> {
        let document = to_tantivy_doc(&self.index.schema(), id, fields)?;

        let mut writer = self.writer.lock().map_err(|_| poisoned())?;
        writer.delete_term(self.id_term(id));
        if let Err(e) = writer.add_document(document) {
            let _ = writer.rollback();
            return Err(e.into());
        }
        self.commit(&mut writer)
    }

    fn delete_document(&self, id: &str) -> EngineResult<()> {
        let mut writer = self.writer.lock().map_err(|_| poisoned())?;
        writer.delete_term(self.id_term(id));
        self.commit(&mut writer)
    }

    fn run_query(&self, request: &SearchRequest) -> EngineResult<SearchResponse> {
        let started = Instant::now();
        let keys = request
            .sort
            .iter()
            .map(|k| SortKey::parse(k))
            .collect::<EngineResult<Vec<_>>>()?;

        let searcher = self.reader.searcher();
        let analyzer = self.index.tokenizer_for_field(self.fields.all)?;
        let mut builder = QueryBuilder::new(&searcher, self.fields, analyzer);
        let query = builder.build(&request.expr)?;

        let total = searcher.search(query.as_ref(), &Count)?;
        let mut matched = Vec::with_capacity(total);
        if total > 0 {
            for (score, address) in searcher.search(query.as_ref(), &TopDocs::with_limit(total))? {
                matched.push((read_stored(&searcher, &self.fields, address)?, f64::from(score)));
            }
        }

        let mut candidates: Vec<Candidate<'_>> = matched
            .iter()
            .map(|(stored, score)| Candidate {
                id: stored.id.as_str(),
                doc: &stored.doc,
                score: *score,
            })
            .collect();
        sorter::sort(&mut candidates, &keys);

        let mut hits = Vec::new();
        for (rank, candidate) in candidates
            .into_iter()
            .enumerate()
            .skip(request.offset)
            .take(request.size)
        {
            let locations = if request.include_locations {
                builder.locations(candidate.doc)
            } else {
                Default::default()
            };
            hits.push(Hit {
                id: candidate.id.to_string(),
                fields: candidate.doc.project(&request.fields),
                score: candidate.score,
                size: serde_json::to_vec(candidate.doc)?.len() as u64,
                rank: rank as u64,
                locations,
            });
        }

        Ok(SearchResponse {
            total: total as u64,
            hits,
            took: started.elapsed(),
        })
    }
}

impl fmt::Debug for TantivyEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TantivyEngine")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
