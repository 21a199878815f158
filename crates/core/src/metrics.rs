//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Batch decisions (accepted, rejected, failures, aborts)
//! - Tracker fetches by kind

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Decision Metrics
// =============================================================================

/// Items decided total by result.
pub static ITEMS_DECIDED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("peersift_items_decided_total", "Total items decided"),
        &["result"], // "accepted", "rejected"
    )
    .unwrap()
});

/// Items left undecided by a per-item failure.
pub static ITEM_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "peersift_item_failures_total",
        "Total items that failed before a decision",
    )
    .unwrap()
});

/// Batches aborted by a credential rejection.
pub static BATCH_ABORTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "peersift_batch_aborts_total",
        "Total batches aborted before completion",
    )
    .unwrap()
});

// =============================================================================
// Fetch Metrics
// =============================================================================

/// Tracker fetch duration in seconds.
pub static FETCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("peersift_fetch_duration_seconds", "Duration of tracker fetches")
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0]),
        &["kind"], // "detail", "peers", "promotion", "warmup"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(ITEMS_DECIDED.clone()),
        Box::new(ITEM_FAILURES.clone()),
        Box::new(BATCH_ABORTS.clone()),
        Box::new(FETCH_DURATION.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initialize() {
        ITEMS_DECIDED.with_label_values(&["accepted"]).inc();
        ITEM_FAILURES.inc();
        BATCH_ABORTS.inc();
        FETCH_DURATION.with_label_values(&["detail"]).observe(0.2);

        assert!(ITEMS_DECIDED.with_label_values(&["accepted"]).get() >= 1);
        assert!(ITEM_FAILURES.get() >= 1);
    }

    #[test]
    fn test_all_metrics_registers_cleanly() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        assert!(!registry.gather().is_empty());
    }
}
