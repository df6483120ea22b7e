//! Observability subsystem for searchdoc
//!
//! - Structured logging (one JSON object per line, stderr)
//! - Monotonic counters
//! - Typed events
//!
//! Observability is read-only: it never changes the outcome of an operation.
//!
//! ```ignore
//! use searchdoc::observability::{log_event, Event, MetricsRegistry};
//!
//! log_event(Event::DocumentPut, &[("collection", "users"), ("id", "a1")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_puts();
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Logs a typed event at its default severity
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
