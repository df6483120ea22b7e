//! Search engine error types

use std::io;

use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Failures surfaced by a search engine on index, search or delete
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Engine unavailable: {0}")]
    Unavailable(String),
}

impl From<tantivy::TantivyError> for EngineError {
    fn from(err: tantivy::TantivyError) -> Self {
        EngineError::Index(err.to_string())
    }
}

impl EngineError {
    /// Short machine-readable kind, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Io(_) => "io",
            EngineError::Serialization(_) => "serialization",
            EngineError::InvalidQuery(_) => "invalid_query",
            EngineError::Index(_) => "index",
            EngineError::Unavailable(_) => "unavailable",
        }
    }
}
