//! Document store error types
//!
//! Error codes:
//! - SEARCHDOC_INVALID_ARGUMENT
//! - SEARCHDOC_NOT_FOUND
//! - SEARCHDOC_ID_GENERATION_FAILED
//! - SEARCHDOC_ENGINE_FAILED

use std::fmt;

use crate::engine::EngineError;

/// Store-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    /// Malformed input, e.g. a non-string `id`
    InvalidArgument,
    /// Point lookup found nothing
    NotFound,
    /// Identifier minting failed
    IdGeneration,
    /// The search engine failed on index, search or delete
    Engine,
}

impl StoreErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            StoreErrorCode::InvalidArgument => "SEARCHDOC_INVALID_ARGUMENT",
            StoreErrorCode::NotFound => "SEARCHDOC_NOT_FOUND",
            StoreErrorCode::IdGeneration => "SEARCHDOC_ID_GENERATION_FAILED",
            StoreErrorCode::Engine => "SEARCHDOC_ENGINE_FAILED",
        }
    }
}

impl fmt::Display for StoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Store error with code, message and engine cause
#[derive(Debug)]
pub struct StoreError {
    code: StoreErrorCode,
    message: String,
    source: Option<EngineError>,
}

impl StoreError {
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self {
            code: StoreErrorCode::InvalidArgument,
            message: reason.into(),
            source: None,
        }
    }

    pub fn not_found(collection: &str, id: &str) -> Self {
        Self {
            code: StoreErrorCode::NotFound,
            message: format!("no document '{}' in '{}'", id, collection),
            source: None,
        }
    }

    pub fn id_generation(reason: impl Into<String>) -> Self {
        Self {
            code: StoreErrorCode::IdGeneration,
            message: reason.into(),
            source: None,
        }
    }

    pub fn engine(context: impl Into<String>, source: EngineError) -> Self {
        Self {
            code: StoreErrorCode::Engine,
            message: context.into(),
            source: Some(source),
        }
    }

    pub fn code(&self) -> StoreErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn engine_error(&self) -> Option<&EngineError> {
        self.source.as_ref()
    }

    pub fn is_not_found(&self) -> bool {
        self.code == StoreErrorCode::NotFound
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
