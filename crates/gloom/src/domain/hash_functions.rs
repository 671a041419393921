//! Derived multi-hash family
//!
//! One fast 32-bit hash is evaluated over the two halves of an item and the
//! k outputs are derived by index perturbation:
//!
//! ```text
//! digest_i = H(left) + i + H(right)    (u32, wrapping)
//! position_i = digest_i mod m
//! ```
//!
//! The digests are fixed at 32 bits, so a filter using this family is capped
//! at [`MultiHashFamily::MAX_BIT_LENGTH`] bits.

use std::fmt;
use std::io::Cursor;
use std::sync::{Arc, LazyLock};

use crate::error::{FilterError, Result};

/// A 32-bit hash primitive over byte sequences
///
/// Implementations must be pure: the same bytes always give the same value.
/// Two families only count as the same hash function when they hold the
/// same `Arc`.
pub trait Hash32: Send + Sync + fmt::Debug {
    fn hash32(&self, bytes: &[u8]) -> u32;
}

/// MurmurHash3 x86 32-bit, seed 0
#[derive(Clone, Copy, Debug, Default)]
pub struct Murmur3;

impl Hash32 for Murmur3 {
    fn hash32(&self, bytes: &[u8]) -> u32 {
        murmur3_32(bytes)
    }
}

/// Shared by every family built with [`MultiHashFamily::new`]
static DEFAULT_HASHER: LazyLock<Arc<dyn Hash32>> = LazyLock::new(|| Arc::new(Murmur3));

/// MurmurHash3 x86 32-bit with a zero seed
///
/// An empty input hashes to 0.
pub fn murmur3_32(key: &[u8]) -> u32 {
    let mut cursor = Cursor::new(key);

    // Reading from an in-memory cursor cannot fail
    murmur3::murmur3_32(&mut cursor, 0).unwrap_or(0)
}

/// k digests derived from a single 32-bit hash
#[derive(Clone, Debug)]
pub struct MultiHashFamily {
    hash_count: usize,
    hasher: Arc<dyn Hash32>,
}

impl MultiHashFamily {
    /// Largest bit length a 32-bit digest can address
    pub const MAX_BIT_LENGTH: usize = 32;

    /// Family backed by [`Murmur3`]
    pub fn new(hash_count: usize) -> Result<Self> {
        Self::with_hasher(hash_count, Arc::clone(&DEFAULT_HASHER))
    }

    /// Family backed by a caller-supplied 32-bit primitive
    pub fn with_hasher(hash_count: usize, hasher: Arc<dyn Hash32>) -> Result<Self> {
        if hash_count == 0 {
            return Err(FilterError::InvalidConfig(
                "hash_count cannot be 0".to_string(),
            ));
        }
        Ok(Self { hash_count, hasher })
    }

    pub fn hash_count(&self) -> usize {
        self.hash_count
    }

    /// True when both families produce identical digests: same k and the
    /// very same hash primitive
    pub fn same_hashes(&self, other: &MultiHashFamily) -> bool {
        self.hash_count == other.hash_count && Arc::ptr_eq(&self.hasher, &other.hasher)
    }

    /// Raw 32-bit digests for `item`, one per hash function
    ///
    /// The item is split at its midpoint; an odd trailing byte belongs to
    /// the right half.
    pub fn digest(&self, item: &[u8]) -> Vec<u32> {
        let (left, right) = item.split_at(item.len() / 2);
        let base_left = self.hasher.hash32(left);
        let base_right = self.hasher.hash32(right);

        (0..self.hash_count)
            .map(|i| {
                base_left
                    .wrapping_add(i as u32)
                    .wrapping_add(base_right)
            })
            .collect()
    }

    /// Bit positions for `item` in a filter of `bit_length` bits
    pub fn positions(&self, item: &[u8], bit_length: usize) -> Vec<usize> {
        self.digest(item)
            .into_iter()
            .map(|d| d as usize % bit_length)
            .collect()
    }
}
