//! Operation counters for shared filters
//!
//! A [`SharedBloomFilter`](crate::service::SharedBloomFilter) hands each
//! add, test and absorb to its [`MetricsRecorder`]. [`Metrics`] keeps plain
//! atomic totals; [`NoOpMetrics`] drops everything.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use gloom::{BloomFilter, Metrics, SharedBloomFilter};
//!
//! let metrics = Arc::new(Metrics::new());
//! let filter = BloomFilter::new_multihash(0, 32, 3).unwrap();
//! let shared = SharedBloomFilter::with_metrics(filter, metrics.clone());
//!
//! shared.add(b"test").unwrap();
//! assert!(shared.test(b"test").unwrap());
//! assert_eq!(metrics.snapshot().lookups_positive, 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Running totals, updated with relaxed atomics
#[derive(Debug, Default)]
pub struct Metrics {
    pub items_inserted: AtomicU64,
    pub lookups_performed: AtomicU64,
    /// Lookups answered "maybe present"; false positives count here too
    pub lookups_positive: AtomicU64,
    /// Private filters absorbed into a shared one
    pub filters_merged: AtomicU64,
    /// Nanoseconds spent inside `test`, saturating at `u64::MAX` per call
    pub lookup_time_ns: AtomicU64,
    /// Nanoseconds spent inside `add`, saturating at `u64::MAX` per call
    pub insert_time_ns: AtomicU64,
}

fn nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

/// Counter values read at one moment, with per-call averages
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub items_inserted: u64,
    pub lookups_performed: u64,
    pub lookups_positive: u64,
    pub filters_merged: u64,
    pub avg_lookup_ns: u64,
    pub avg_insert_ns: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_insert(&self, duration: Duration) {
        self.items_inserted.fetch_add(1, Ordering::Relaxed);
        self.insert_time_ns
            .fetch_add(nanos(duration), Ordering::Relaxed);
    }

    /// `found` is what the filter answered, not ground truth
    pub fn record_lookup(&self, duration: Duration, found: bool) {
        self.lookups_performed.fetch_add(1, Ordering::Relaxed);
        self.lookup_time_ns
            .fetch_add(nanos(duration), Ordering::Relaxed);
        if found {
            self.lookups_positive.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_merge(&self) {
        self.filters_merged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            items_inserted: self.items_inserted.load(Ordering::Relaxed),
            lookups_performed: self.lookups_performed.load(Ordering::Relaxed),
            lookups_positive: self.lookups_positive.load(Ordering::Relaxed),
            filters_merged: self.filters_merged.load(Ordering::Relaxed),
            avg_lookup_ns: average(&self.lookup_time_ns, &self.lookups_performed),
            avg_insert_ns: average(&self.insert_time_ns, &self.items_inserted),
        }
    }

    /// Share of lookups answered "maybe present", or 0 before any lookup
    ///
    /// This is the empirical false positive rate only when every queried
    /// item was absent.
    pub fn observed_positive_rate(&self) -> f64 {
        let total = self.lookups_performed.load(Ordering::Relaxed);
        let positive = self.lookups_positive.load(Ordering::Relaxed);
        if total > 0 {
            positive as f64 / total as f64
        } else {
            0.0
        }
    }

    pub fn reset(&self) {
        self.items_inserted.store(0, Ordering::Relaxed);
        self.lookups_performed.store(0, Ordering::Relaxed);
        self.lookups_positive.store(0, Ordering::Relaxed);
        self.filters_merged.store(0, Ordering::Relaxed);
        self.lookup_time_ns.store(0, Ordering::Relaxed);
        self.insert_time_ns.store(0, Ordering::Relaxed);
    }
}

fn average(total: &AtomicU64, count: &AtomicU64) -> u64 {
    let count = count.load(Ordering::Relaxed);
    if count > 0 {
        total.load(Ordering::Relaxed) / count
    } else {
        0
    }
}

/// Where a shared filter reports its operations
pub trait MetricsRecorder: Send + Sync {
    fn record_insert(&self, duration: Duration);

    fn record_lookup(&self, duration: Duration, found: bool);

    fn record_merge(&self);
}

/// Recorder that discards every event
#[derive(Debug, Default)]
pub struct NoOpMetrics;

impl MetricsRecorder for NoOpMetrics {
    fn record_insert(&self, _: Duration) {}
    fn record_lookup(&self, _: Duration, _: bool) {}
    fn record_merge(&self) {}
}

impl MetricsRecorder for Metrics {
    fn record_insert(&self, duration: Duration) {
        Metrics::record_insert(self, duration);
    }

    fn record_lookup(&self, duration: Duration, found: bool) {
        Metrics::record_lookup(self, duration, found);
    }

    fn record_merge(&self) {
        Metrics::record_merge(self);
    }
}
