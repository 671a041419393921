//! # Gloom
//!
//! Probabilistic set membership with Bloom filters.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): Pure filter logic, no I/O
//!   - `BitVector`: Fixed-length monotone bit storage
//!   - `MultiHashFamily`: k digests derived from one MurmurHash3 (m <= 32)
//!   - `SaltedHashFamily`: One named digest per (algorithm, salt) pair
//!   - `DigestRegistry`: Injected name → digest function table
//!   - `BloomFilter`: Orchestrates storage and hashing
//!   - `BloomConfig` / `BloomConfigBuilder`: Validated configuration
//!
//! - **Service Layer** (`service/`): Thread-safe handles
//!   - `SharedBloomFilter`: `RwLock`-guarded filter with merge support
//!
//! ## Invariants
//!
//! - No false negatives: once added, `test()` MUST return true
//! - Each add/test computes exactly k positions, all below m
//! - Bits and the insertion count never decrease
//!
//! ## Usage Example
//!
//! ```
//! use std::sync::Arc;
//! use gloom::{BloomFilter, DigestRegistry, HashSpec};
//!
//! let mut filter = BloomFilter::new_multihash(0, 32, 3)?;
//! filter.add(b"test")?;
//! assert!(filter.test(b"test")?);
//!
//! let registry = Arc::new(DigestRegistry::with_defaults());
//! let specs = vec![HashSpec::new("sha256", "asd")?, HashSpec::new("sha256", "asdasda")?];
//! let mut salted = BloomFilter::new_salted(1, 48, specs, registry)?;
//! salted.add(b"password")?;
//! assert!(salted.test(b"password")?);
//! # Ok::<(), gloom::FilterError>(())
//! ```

pub mod domain;
pub mod error;
pub mod metrics;
pub mod service;

// Re-exports for convenience
pub use domain::{
    BitVector, BloomConfig, BloomConfigBuilder, BloomFilter, DigestRegistry, Digests, HashConfig,
    HashSpec,
};
pub use error::{FilterError, Result};
pub use metrics::{Metrics, MetricsRecorder, MetricsSnapshot, NoOpMetrics};
pub use service::SharedBloomFilter;
