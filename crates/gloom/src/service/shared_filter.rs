//! Thread-safe filter handle
//!
//! ## Consistency
//!
//! A single `add` sets several bits. `SharedBloomFilter` holds the write
//! lock for the whole digest-and-set phase, so a concurrent `test` sees the
//! filter either before or after that add, never in between. Tests only
//! take the read lock and run concurrently with each other.
//!
//! For write-heavy loads give each worker a private [`BloomFilter`] with the
//! same configuration and fold it in with [`SharedBloomFilter::absorb`],
//! which takes the write lock once per merge instead of once per item.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::debug;

use crate::domain::{BloomFilter, HashSpec};
use crate::error::Result;
use crate::metrics::{MetricsRecorder, NoOpMetrics};

/// Cloneable, lock-guarded handle to one [`BloomFilter`]
#[derive(Clone)]
pub struct SharedBloomFilter {
    inner: Arc<RwLock<BloomFilter>>,
    metrics: Arc<dyn MetricsRecorder>,
}

impl SharedBloomFilter {
    pub fn new(filter: BloomFilter) -> Self {
        Self::with_metrics(filter, Arc::new(NoOpMetrics))
    }

    pub fn with_metrics(filter: BloomFilter, metrics: Arc<dyn MetricsRecorder>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(filter)),
            metrics,
        }
    }

    pub fn add(&self, item: &[u8]) -> Result<()> {
        let start = Instant::now();
        self.inner.write().add(item)?;
        self.metrics.record_insert(start.elapsed());
        Ok(())
    }

    pub fn test(&self, item: &[u8]) -> Result<bool> {
        let start = Instant::now();
        let found = self.inner.read().test(item)?;
        self.metrics.record_lookup(start.elapsed(), found);
        Ok(found)
    }

    pub fn add_filter(&self, spec: HashSpec) -> Result<()> {
        self.inner.write().add_filter(spec)
    }

    /// OR a private filter into the shared one
    pub fn absorb(&self, local: &BloomFilter) -> Result<()> {
        let mut guard = self.inner.write();
        guard.merge(local)?;
        debug!(n = guard.insertion_count(), "Absorbed local filter");
        drop(guard);
        self.metrics.record_merge();
        Ok(())
    }

    /// Copy of the current filter state
    pub fn snapshot(&self) -> BloomFilter {
        self.inner.read().clone()
    }

    pub fn insertion_count(&self) -> usize {
        self.inner.read().insertion_count()
    }

    pub fn describe(&self) -> String {
        self.inner.read().describe()
    }

    /// Take the filter back if this is the last handle
    pub fn try_into_inner(self) -> std::result::Result<BloomFilter, Self> {
        let metrics = self.metrics;
        Arc::try_unwrap(self.inner)
            .map(|lock| lock.into_inner())
            .map_err(|inner| Self { inner, metrics })
    }
}

impl fmt::Debug for SharedBloomFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBloomFilter")
            .field("filter", &self.describe())
            .finish()
    }
}
