//! Observable events for searchdoc
//!
//! Events are explicit and typed; each carries its default severity.

use std::fmt;

use super::logger::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration & lifecycle
    /// Configuration loaded
    ConfigLoaded,
    /// A collection was opened in the catalog
    CollectionOpened,
    /// Serving loop entered
    Serving,
    /// A protocol request failed
    RequestFailed,

    // Writes
    /// Document merged and written
    DocumentPut,
    /// Document write failed
    DocumentPutFailed,
    /// Document removed
    DocumentDeleted,
    /// Engine refused a delete; suppressed
    DocumentDeleteFailed,

    // Reads
    /// Search executed
    SearchComplete,
    /// Search failed at the engine
    SearchFailed,
    /// A join could not be resolved
    JoinFailed,

    // Aggregation
    /// Aggregation computed
    AggregateComplete,
    /// Aggregation fell back to a degraded value
    AggregateDegraded,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::CollectionOpened => "COLLECTION_OPENED",
            Event::Serving => "SEARCHDOC_SERVING",
            Event::RequestFailed => "REQUEST_FAILED",
            Event::DocumentPut => "DOCUMENT_PUT",
            Event::DocumentPutFailed => "DOCUMENT_PUT_FAILED",
            Event::DocumentDeleted => "DOCUMENT_DELETED",
            Event::DocumentDeleteFailed => "DOCUMENT_DELETE_FAILED",
            Event::SearchComplete => "SEARCH_COMPLETE",
            Event::SearchFailed => "SEARCH_FAILED",
            Event::JoinFailed => "JOIN_FAILED",
            Event::AggregateComplete => "AGGREGATE_COMPLETE",
            Event::AggregateDegraded => "AGGREGATE_DEGRADED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::DocumentPut
            | Event::DocumentDeleted
            | Event::SearchComplete
            | Event::AggregateComplete => Severity::Trace,
            Event::ConfigLoaded | Event::CollectionOpened | Event::Serving => Severity::Info,
            Event::JoinFailed | Event::AggregateDegraded | Event::DocumentDeleteFailed => {
                Severity::Warn
            }
            Event::RequestFailed | Event::DocumentPutFailed | Event::SearchFailed => {
                Severity::Error
            }
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
