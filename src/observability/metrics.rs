//! Metrics registry for searchdoc
//!
//! - Counters only, monotonic
//! - Reset only on process start
//! - Lock-free; Relaxed ordering is enough for counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters shared by every store of a catalog
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    puts: AtomicU64,
    put_failures: AtomicU64,
    gets: AtomicU64,
    get_misses: AtomicU64,
    deletes: AtomicU64,
    delete_failures: AtomicU64,
    searches: AtomicU64,
    search_failures: AtomicU64,
    joins_resolved: AtomicU64,
    joins_failed: AtomicU64,
    aggregations: AtomicU64,
    aggregate_values_skipped: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Writes

    pub fn increment_puts(&self) {
        self.puts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_put_failures(&self) {
        self.put_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_deletes(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_delete_failures(&self) {
        self.delete_failures.fetch_add(1, Ordering::Relaxed);
    }

    // Reads

    pub fn increment_gets(&self) {
        self.gets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_get_misses(&self) {
        self.get_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_searches(&self) {
        self.searches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_search_failures(&self) {
        self.search_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_joins_resolved(&self) {
        self.joins_resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_joins_failed(&self) {
        self.joins_failed.fetch_add(1, Ordering::Relaxed);
    }

    // Aggregation

    pub fn increment_aggregations(&self) {
        self.aggregations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_aggregate_values_skipped(&self, count: u64) {
        self.aggregate_values_skipped
            .fetch_add(count, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            puts: self.puts.load(Ordering::Relaxed),
            put_failures: self.put_failures.load(Ordering::Relaxed),
            gets: self.gets.load(Ordering::Relaxed),
            get_misses: self.get_misses.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            delete_failures: self.delete_failures.load(Ordering::Relaxed),
            searches: self.searches.load(Ordering::Relaxed),
            search_failures: self.search_failures.load(Ordering::Relaxed),
            joins_resolved: self.joins_resolved.load(Ordering::Relaxed),
            joins_failed: self.joins_failed.load(Ordering::Relaxed),
            aggregations: self.aggregations.load(Ordering::Relaxed),
            aggregate_values_skipped: self.aggregate_values_skipped.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub puts: u64,
    pub put_failures: u64,
    pub gets: u64,
    pub get_misses: u64,
    pub deletes: u64,
    pub delete_failures: u64,
    pub searches: u64,
    pub search_failures: u64,
    pub joins_resolved: u64,
    pub joins_failed: u64,
    pub aggregations: u64,
    pub aggregate_values_skipped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_is_zero() {
        assert_eq!(MetricsRegistry::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_counters() {
        let registry = MetricsRegistry::new();
        registry.increment_puts();
        registry.increment_puts();
        registry.increment_get_misses();
        registry.increment_joins_failed();
        registry.add_aggregate_values_skipped(3);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.puts, 2);
        assert_eq!(snapshot.get_misses, 1);
        assert_eq!(snapshot.joins_failed, 1);
        assert_eq!(snapshot.aggregate_values_skipped, 3);
    }

    #[test]
    fn test_snapshot_serializes() {
        let registry = MetricsRegistry::new();
        registry.increment_searches();
        let value = serde_json::to_value(registry.snapshot()).unwrap();
        assert_eq!(value["searches"], 1);
        assert_eq!(value["puts"], 0);
    }

    #[test]
    fn test_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(MetricsRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reg = Arc::clone(&registry);
                thread::spawn(move || {
                    for _ in 0..100 {
                        reg.increment_searches();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.snapshot().searches, 800);
    }
}
