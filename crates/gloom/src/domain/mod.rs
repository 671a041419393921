//! Domain Layer - Pure filter logic
//!
//! This layer contains:
//! - Bit vector storage
//! - Hash families (derived multihash, salted digests)
//! - The Bloom filter orchestrating both
//! - Sizing formulas and configuration
//!
//! RULES:
//! - No I/O operations
//! - No locking; see `service` for thread-safe handles

pub mod bit_vector;
pub mod bloom_filter;
pub mod config;
pub mod hash_functions;
pub mod parameters;
pub mod salted;

pub use bit_vector::BitVector;
pub use bloom_filter::{BloomFilter, Digests, HashFamily};
pub use config::{BloomConfig, BloomConfigBuilder, HashConfig};
pub use hash_functions::{murmur3_32, Hash32, Murmur3, MultiHashFamily};
pub use parameters::{calculate_fpr, calculate_optimal_parameters, BloomFilterParams};
pub use salted::{prefix_position, DigestFn, DigestRegistry, HashSpec, SaltedHashFamily};
