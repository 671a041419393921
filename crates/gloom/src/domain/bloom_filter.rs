//! Core Bloom filter
//!
//! INVARIANTS:
//! - No false negatives: once `add(x)` returns, `test(x)` is true
//! - Every add/test computes exactly `hash_count()` positions, each < m
//! - Bits are monotone and `insertion_count()` only grows

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::bit_vector::BitVector;
use super::config::{BloomConfig, HashConfig};
use super::hash_functions::{Hash32, MultiHashFamily};
use super::parameters::calculate_fpr;
use super::salted::{DigestRegistry, HashSpec, SaltedHashFamily};
use crate::error::{FilterError, Result};

/// The hash family a filter was built with
#[derive(Clone, Debug)]
pub enum HashFamily {
    MultiHash(MultiHashFamily),
    Salted(SaltedHashFamily),
}

impl HashFamily {
    pub fn hash_count(&self) -> usize {
        match self {
            HashFamily::MultiHash(family) => family.hash_count(),
            HashFamily::Salted(family) => family.hash_count(),
        }
    }

    fn positions(&self, item: &[u8], bit_length: usize) -> Result<Vec<usize>> {
        match self {
            HashFamily::MultiHash(family) => Ok(family.positions(item, bit_length)),
            HashFamily::Salted(family) => family.positions(item, bit_length),
        }
    }

    fn compatible_with(&self, other: &HashFamily) -> bool {
        match (self, other) {
            (HashFamily::MultiHash(a), HashFamily::MultiHash(b)) => a.same_hashes(b),
            (HashFamily::Salted(a), HashFamily::Salted(b)) => a.same_hashes(b),
            _ => false,
        }
    }
}

/// Raw digests of one item
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Digests {
    /// 32-bit digests from the multihash family
    MultiHash(Vec<u32>),
    /// Hex-encoded digests from the salted family, in spec order
    Salted(Vec<String>),
}

impl Digests {
    pub fn len(&self) -> usize {
        match self {
            Digests::MultiHash(d) => d.len(),
            Digests::Salted(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bloom filter for probabilistic membership testing
///
/// False positives are possible, false negatives are not. Items cannot be
/// removed.
#[derive(Clone, Debug)]
pub struct BloomFilter {
    /// Bit array storing the filter state
    bits: BitVector,
    family: HashFamily,
    /// Size in bits (m)
    m: usize,
    /// Number of items inserted (c)
    n: usize,
    /// Sizing hint given at construction
    expected_items: usize,
}

fn check_bit_length(bit_length: usize, max: Option<usize>) -> Result<()> {
    if bit_length == 0 {
        return Err(FilterError::InvalidConfig(
            "bit_length cannot be 0".to_string(),
        ));
    }
    if let Some(max) = max {
        if bit_length > max {
            return Err(FilterError::InvalidConfig(format!(
                "bit_length {} exceeds {} for this hash family",
                bit_length, max
            )));
        }
    }
    Ok(())
}

impl BloomFilter {
    fn with_family(expected_items: usize, bit_length: usize, family: HashFamily) -> Result<Self> {
        let bits = BitVector::new(bit_length)?;
        debug!(
            m = bit_length,
            k = family.hash_count(),
            expected_items,
            "Created bloom filter"
        );
        Ok(Self {
            bits,
            family,
            m: bit_length,
            n: 0,
            expected_items,
        })
    }

    /// Filter using the MurmurHash3-derived multihash family
    ///
    /// `bit_length` must be in `1..=32`.
    pub fn new_multihash(expected_items: usize, bit_length: usize, hash_count: usize) -> Result<Self> {
        check_bit_length(bit_length, Some(MultiHashFamily::MAX_BIT_LENGTH))?;
        let family = MultiHashFamily::new(hash_count)?;
        Self::with_family(expected_items, bit_length, HashFamily::MultiHash(family))
    }

    /// Multihash filter over a caller-supplied 32-bit primitive
    pub fn new_multihash_with_hasher(
        expected_items: usize,
        bit_length: usize,
        hash_count: usize,
        hasher: Arc<dyn Hash32>,
    ) -> Result<Self> {
        check_bit_length(bit_length, Some(MultiHashFamily::MAX_BIT_LENGTH))?;
        let family = MultiHashFamily::with_hasher(hash_count, hasher)?;
        Self::with_family(expected_items, bit_length, HashFamily::MultiHash(family))
    }

    /// Filter using one salted digest per spec
    pub fn new_salted(
        expected_items: usize,
        bit_length: usize,
        specs: Vec<HashSpec>,
        registry: Arc<DigestRegistry>,
    ) -> Result<Self> {
        check_bit_length(bit_length, None)?;
        let family = SaltedHashFamily::new(specs, registry)?;
        Self::with_family(expected_items, bit_length, HashFamily::Salted(family))
    }

    /// Build a filter from a validated configuration
    ///
    /// The registry is only consulted for salted configurations.
    pub fn from_config(config: &BloomConfig, registry: Arc<DigestRegistry>) -> Result<Self> {
        config.validate()?;
        match &config.hashes {
            HashConfig::MultiHash { hash_count } => {
                Self::new_multihash(config.expected_items, config.bit_length, *hash_count)
            }
            HashConfig::Salted { specs } => Self::new_salted(
                config.expected_items,
                config.bit_length,
                specs.clone(),
                registry,
            ),
        }
    }

    /// Insert an item
    ///
    /// After insertion, `test(item)` is guaranteed to return true.
    pub fn add(&mut self, item: &[u8]) -> Result<()> {
        let positions = self.family.positions(item, self.m)?;
        for pos in positions {
            self.bits.set(pos)?;
        }
        self.n += 1;
        trace!(n = self.n, "Inserted item");
        Ok(())
    }

    /// Test if an item might be in the filter
    ///
    /// Returns:
    /// - `true` if the item might be in the set (could be false positive)
    /// - `false` if the item is definitely NOT in the set
    pub fn test(&self, item: &[u8]) -> Result<bool> {
        for pos in self.family.positions(item, self.m)? {
            if !self.bits.test(pos)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Raw digests for `item`, one per hash function
    pub fn digest(&self, item: &[u8]) -> Result<Digests> {
        match &self.family {
            HashFamily::MultiHash(family) => Ok(Digests::MultiHash(family.digest(item))),
            HashFamily::Salted(family) => Ok(Digests::Salted(family.digest(item)?)),
        }
    }

    /// Append a hash spec to a salted filter
    ///
    /// Only allowed before the first insertion: bits set by earlier adds
    /// were not computed with the new spec.
    pub fn add_filter(&mut self, spec: HashSpec) -> Result<()> {
        if self.n > 0 {
            warn!(
                inserted = self.n,
                algorithm = spec.algorithm(),
                "Rejected hash spec on non-empty filter"
            );
            return Err(FilterError::FrozenConfiguration { inserted: self.n });
        }
        match &mut self.family {
            HashFamily::Salted(family) => {
                family.push(spec)?;
                debug!(k = family.hash_count(), "Appended hash spec");
                Ok(())
            }
            HashFamily::MultiHash(_) => Err(FilterError::InvalidConfig(
                "hash specs only apply to salted filters".to_string(),
            )),
        }
    }

    /// Merge another filter into this one (OR operation)
    ///
    /// Both filters must share bit length and hash configuration. After the
    /// merge this filter matches every item of both, and its insertion count
    /// is the sum of the two.
    pub fn merge(&mut self, other: &BloomFilter) -> Result<()> {
        if self.m != other.m {
            return Err(FilterError::IncompatibleFilters(format!(
                "bit lengths differ: {} vs {}",
                self.m, other.m
            )));
        }
        if !self.family.compatible_with(&other.family) {
            return Err(FilterError::IncompatibleFilters(
                "hash configurations differ".to_string(),
            ));
        }

        self.bits.union(&other.bits)?;
        self.n += other.n;
        debug!(n = self.n, merged = other.n, "Merged bloom filters");
        Ok(())
    }

    /// Human-readable summary
    pub fn describe(&self) -> String {
        format!(
            "Bloom filter with {} filters, {} items and bitset size of {}",
            self.hash_count(),
            self.n,
            self.m
        )
    }

    /// Theoretical false positive rate at the current insertion count
    ///
    /// Formula: FPR = (1 - e^(-kn/m))^k
    pub fn false_positive_rate(&self) -> f64 {
        calculate_fpr(self.m, self.n, self.hash_count())
    }

    /// Theoretical false positive rate once `expected_items` are inserted
    pub fn expected_false_positive_rate(&self) -> f64 {
        calculate_fpr(self.m, self.expected_items, self.hash_count())
    }

    /// Get the number of bits set in the filter
    pub fn bits_set(&self) -> usize {
        self.bits.count_ones()
    }

    /// Read-only view of the bit vector
    pub fn bits(&self) -> &BitVector {
        &self.bits
    }

    pub fn bit_length(&self) -> usize {
        self.m
    }

    pub fn hash_count(&self) -> usize {
        self.family.hash_count()
    }

    pub fn insertion_count(&self) -> usize {
        self.n
    }

    pub fn expected_items(&self) -> usize {
        self.expected_items
    }

    pub fn family(&self) -> &HashFamily {
        &self.family
    }
}

impl fmt::Display for BloomFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::OnceLock;

    /// One registry for the whole module so salted filters stay mergeable
    fn registry() -> Arc<DigestRegistry> {
        static REGISTRY: OnceLock<Arc<DigestRegistry>> = OnceLock::new();
        Arc::clone(REGISTRY.get_or_init(|| Arc::new(DigestRegistry::with_defaults())))
    }

    fn salted(m: usize, salts: &[&str]) -> BloomFilter {
        let specs = salts
            .iter()
            .map(|s| HashSpec::new("sha256", *s).unwrap())
            .collect();
        BloomFilter::new_salted(0, m, specs, registry()).unwrap()
    }

    #[test]
    fn test_new_multihash_creates_empty_filter() {
        let filter = BloomFilter::new_multihash(10, 32, 3).unwrap();

        assert_eq!(filter.bit_length(), 32);
        assert_eq!(filter.hash_count(), 3);
        assert_eq!(filter.insertion_count(), 0);
        assert_eq!(filter.expected_items(), 10);
        assert_eq!(filter.bits_set(), 0);
    }

    #[test]
    fn test_multihash_bit_length_ceiling() {
        assert!(BloomFilter::new_multihash(0, 32, 3).is_ok());
        assert!(matches!(
            BloomFilter::new_multihash(0, 33, 3),
            Err(FilterError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_invalid_construction() {
        assert!(matches!(
            BloomFilter::new_multihash(0, 0, 3),
            Err(FilterError::InvalidConfig(_))
        ));
        assert!(matches!(
            BloomFilter::new_multihash(0, 16, 0),
            Err(FilterError::InvalidConfig(_))
        ));
        assert!(matches!(
            BloomFilter::new_salted(0, 0, vec![HashSpec::new("sha256", "s").unwrap()], registry()),
            Err(FilterError::InvalidConfig(_))
        ));
        assert!(matches!(
            BloomFilter::new_salted(0, 48, vec![], registry()),
            Err(FilterError::InvalidConfig(_))
        ));
        assert!(matches!(
            BloomFilter::new_salted(0, 48, vec![HashSpec::new("md5", "s").unwrap()], registry()),
            Err(FilterError::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn test_add_then_test_multihash() {
        let mut filter = BloomFilter::new_multihash(0, 32, 3).unwrap();
        filter.add(b"test").unwrap();

        assert!(filter.test(b"test").unwrap());
        assert!(filter.bits_set() >= 1 && filter.bits_set() <= 3);
    }

    #[test]
    fn test_multihash_positions_are_consecutive() {
        // m = 32 divides 2^32, so the wrapping sum reduces to base + i
        let mut filter = BloomFilter::new_multihash(0, 32, 3).unwrap();
        filter.add(b"test").unwrap();

        let Digests::MultiHash(digests) = filter.digest(b"test").unwrap() else {
            panic!("expected multihash digests");
        };
        let base = (digests[0] % 32) as usize;
        let mut want: Vec<usize> = (0..3).map(|i| (base + i) % 32).collect();
        let mut set: Vec<usize> = filter.bits().iter_ones().collect();
        set.sort_unstable();
        want.sort_unstable();
        assert_eq!(set, want);
    }

    #[test]
    fn test_add_then_test_salted() {
        let mut filter = salted(48, &["asd", "asdasda"]);
        filter.add(b"password").unwrap();

        assert!(filter.test(b"password").unwrap());
        assert_eq!(filter.insertion_count(), 1);
    }

    #[test]
    fn test_empty_filter_rejects_everything() {
        let filter = BloomFilter::new_multihash(0, 32, 3).unwrap();
        for i in 0..100 {
            assert!(!filter.test(format!("item_{}", i).as_bytes()).unwrap());
        }
    }

    #[test]
    fn test_insertion_count_counts_duplicates() {
        let mut filter = BloomFilter::new_multihash(0, 16, 2).unwrap();
        filter.add(b"a").unwrap();
        filter.add(b"a").unwrap();
        filter.add(b"").unwrap();
        assert_eq!(filter.insertion_count(), 3);
    }

    #[test]
    fn test_describe() {
        let mut filter = BloomFilter::new_multihash(0, 32, 3).unwrap();
        assert_eq!(
            filter.describe(),
            "Bloom filter with 3 filters, 0 items and bitset size of 32"
        );

        filter.add(b"test").unwrap();
        assert_eq!(
            filter.to_string(),
            "Bloom filter with 3 filters, 1 items and bitset size of 32"
        );
    }

    #[test]
    fn test_add_filter_before_insert() {
        let mut filter = salted(48, &["asd"]);
        filter.add_filter(HashSpec::new("sha512", "more").unwrap()).unwrap();
        assert_eq!(filter.hash_count(), 2);
        assert_eq!(filter.digest(b"x").unwrap().len(), 2);
    }

    #[test]
    fn test_add_filter_frozen_after_insert() {
        let mut filter = salted(48, &["asd"]);
        filter.add(b"password").unwrap();

        let result = filter.add_filter(HashSpec::new("sha256", "late").unwrap());
        assert_eq!(result, Err(FilterError::FrozenConfiguration { inserted: 1 }));
        assert_eq!(filter.hash_count(), 1);
        assert!(filter.test(b"password").unwrap());
    }

    #[test]
    fn test_add_filter_unknown_algorithm() {
        let mut filter = salted(48, &["asd"]);
        let result = filter.add_filter(HashSpec::new("whirlpool", "x").unwrap());
        assert!(matches!(result, Err(FilterError::UnknownAlgorithm(_))));
        assert_eq!(filter.hash_count(), 1);
    }

    #[test]
    fn test_add_filter_on_multihash_rejected() {
        let mut filter = BloomFilter::new_multihash(0, 32, 3).unwrap();
        let result = filter.add_filter(HashSpec::new("sha256", "x").unwrap());
        assert!(matches!(result, Err(FilterError::InvalidConfig(_))));
    }

    #[test]
    fn test_merge() {
        let mut left = salted(256, &["a", "b", "c"]);
        let mut right = salted(256, &["a", "b", "c"]);

        left.add(b"address_A").unwrap();
        left.add(b"address_B").unwrap();
        right.add(b"address_C").unwrap();

        left.merge(&right).unwrap();

        assert!(left.test(b"address_A").unwrap());
        assert!(left.test(b"address_B").unwrap());
        assert!(left.test(b"address_C").unwrap());
        assert_eq!(left.insertion_count(), 3);
    }

    #[test]
    fn test_merge_incompatible() {
        let mut a = BloomFilter::new_multihash(0, 32, 3).unwrap();
        let b = BloomFilter::new_multihash(0, 16, 3).unwrap();
        let c = BloomFilter::new_multihash(0, 32, 4).unwrap();
        let d = salted(32, &["a", "b", "c"]);

        assert!(matches!(a.merge(&b), Err(FilterError::IncompatibleFilters(_))));
        assert!(matches!(a.merge(&c), Err(FilterError::IncompatibleFilters(_))));
        assert!(matches!(a.merge(&d), Err(FilterError::IncompatibleFilters(_))));

        let mut e = salted(32, &["a", "b", "c"]);
        let f = salted(32, &["a", "b", "z"]);
        assert!(matches!(e.merge(&f), Err(FilterError::IncompatibleFilters(_))));
    }

    #[derive(Debug)]
    struct Constant(u32);

    impl Hash32 for Constant {
        fn hash32(&self, _: &[u8]) -> u32 {
            self.0
        }
    }

    #[test]
    fn test_merge_rejects_distinct_hashers() {
        let mut left =
            BloomFilter::new_multihash_with_hasher(0, 32, 3, Arc::new(Constant(0))).unwrap();
        let mut right =
            BloomFilter::new_multihash_with_hasher(0, 32, 3, Arc::new(Constant(10))).unwrap();
        right.add(b"item").unwrap();

        assert!(matches!(
            left.merge(&right),
            Err(FilterError::IncompatibleFilters(_))
        ));
        assert_eq!(left.insertion_count(), 0);
        assert_eq!(left.bits_set(), 0);

        // Same shape and default hasher on one side is still a different primitive
        let mut default = BloomFilter::new_multihash(0, 32, 3).unwrap();
        assert!(matches!(
            default.merge(&right),
            Err(FilterError::IncompatibleFilters(_))
        ));
    }

    #[test]
    fn test_merge_accepts_shared_hasher() {
        let hasher: Arc<dyn Hash32> = Arc::new(Constant(7));
        let mut left = BloomFilter::new_multihash_with_hasher(0, 32, 3, hasher.clone()).unwrap();
        let mut right = BloomFilter::new_multihash_with_hasher(0, 32, 3, hasher).unwrap();
        right.add(b"item").unwrap();

        left.merge(&right).unwrap();
        assert!(left.test(b"item").unwrap());
        assert_eq!(left.insertion_count(), 1);
    }

    #[test]
    fn test_merge_rejects_registries_sharing_a_name() {
        // Both registries call their function "sha256" but compute different things
        let mut other = DigestRegistry::new();
        other.register("sha256", |item: &[u8], _: &[u8]| vec![item.len() as u8; 32]);
        let other = Arc::new(other);

        let specs = vec![HashSpec::new("sha256", "a").unwrap()];
        let mut left = BloomFilter::new_salted(0, 256, specs.clone(), registry()).unwrap();
        let mut right = BloomFilter::new_salted(0, 256, specs, other).unwrap();
        right.add(b"address_A").unwrap();

        assert!(matches!(
            left.merge(&right),
            Err(FilterError::IncompatibleFilters(_))
        ));
        assert_eq!(left.insertion_count(), 0);
        assert!(!left.test(b"address_A").unwrap());
    }

    #[test]
    fn test_false_positive_rate_tracks_insertions() {
        let mut filter = BloomFilter::new_multihash(4, 32, 3).unwrap();
        assert_eq!(filter.false_positive_rate(), 0.0);

        for i in 0..4 {
            filter.add(format!("item_{}", i).as_bytes()).unwrap();
        }
        assert!((filter.false_positive_rate() - filter.expected_false_positive_rate()).abs() < 1e-12);
        assert!(filter.false_positive_rate() > 0.0);
    }

    #[test]
    fn test_from_config() {
        let config = BloomConfig::default();
        let filter = BloomFilter::from_config(&config, registry()).unwrap();
        assert_eq!(filter.hash_count(), 3);
        assert_eq!(filter.bit_length(), 32);

        let config = BloomConfig {
            expected_items: 5,
            bit_length: 48,
            hashes: HashConfig::Salted {
                specs: vec![HashSpec::new("sha256", "asd").unwrap()],
            },
        };
        let filter = BloomFilter::from_config(&config, registry()).unwrap();
        assert!(matches!(filter.family(), HashFamily::Salted(_)));
        assert_eq!(filter.expected_items(), 5);
    }
}
