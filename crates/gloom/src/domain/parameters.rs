//! Sizing math for filters built with independent hash positions
//!
//! With `c` items in `m` bits and `k` hashes, a bit stays clear with
//! probability `e^(-kc/m)`. A false positive needs all `k` positions set:
//!
//! ```text
//! p(m, c, k) = (1 - e^(-kc/m))^k
//! ```
//!
//! Minimizing `m` for a target `p` gives `m = ceil(-c ln p / ln²2)` and
//! `k = round(ln 2 * m / c)`.

use std::f64::consts::LN_2;

/// Bit length and hash count chosen for an expected item count
#[derive(Clone, Debug, PartialEq)]
pub struct BloomFilterParams {
    pub size_bits: usize,
    pub hash_count: usize,
    /// `calculate_fpr(size_bits, items, hash_count)` for the requested items
    pub expected_fpr: f64,
}

/// Smallest `(m, k)` whose predicted rate stays at or below `target_fpr`
/// once `num_elements` items are in
///
/// `k` is kept within `1..=32`. Zero items needs nothing beyond one bit and
/// one hash.
pub fn calculate_optimal_parameters(num_elements: usize, target_fpr: f64) -> BloomFilterParams {
    if num_elements == 0 {
        return BloomFilterParams {
            size_bits: 1,
            hash_count: 1,
            expected_fpr: 0.0,
        };
    }

    let items = num_elements as f64;
    let bits_per_item = -target_fpr.ln() / (LN_2 * LN_2);
    let size_bits = ((items * bits_per_item).ceil() as usize).max(1);
    let hash_count = ((size_bits as f64 / items) * LN_2).round() as usize;
    let hash_count = hash_count.clamp(1, 32);

    BloomFilterParams {
        size_bits,
        hash_count,
        expected_fpr: calculate_fpr(size_bits, num_elements, hash_count),
    }
}

/// Predicted false positive rate of an `m`-bit filter holding `items`
/// entries with `k` hashes each
///
/// An empty filter never matches; a zero-width one always does.
pub fn calculate_fpr(m: usize, items: usize, k: usize) -> f64 {
    if m == 0 {
        return 1.0;
    }
    let fill = (k as f64) * (items as f64) / (m as f64);
    let set_probability = -(-fill).exp_m1();
    set_probability.powi(i32::try_from(k).unwrap_or(i32::MAX))
}
