//! Salted-digest hash family
//!
//! Each [`HashSpec`] names a digest algorithm and a salt. The algorithm is
//! looked up in a [`DigestRegistry`] injected by the caller, applied to the
//! item and salt, and the digest is reduced to a bit position by its hex
//! prefix (see [`prefix_position`]).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use sha3::{Keccak256, Sha3_256};
use tracing::debug;

use crate::error::{FilterError, Result};

/// A digest function: `(item, salt) -> digest bytes`
pub type DigestFn = Arc<dyn Fn(&[u8], &[u8]) -> Vec<u8> + Send + Sync>;

/// One member of a salted hash family
///
/// Immutable once built; the salt is never empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "HashSpecRepr")]
pub struct HashSpec {
    algorithm: String,
    salt: String,
}

#[derive(Deserialize)]
struct HashSpecRepr {
    algorithm: String,
    salt: String,
}

impl TryFrom<HashSpecRepr> for HashSpec {
    type Error = FilterError;

    fn try_from(repr: HashSpecRepr) -> Result<Self> {
        HashSpec::new(repr.algorithm, repr.salt)
    }
}

impl HashSpec {
    pub fn new(algorithm: impl Into<String>, salt: impl Into<String>) -> Result<Self> {
        let salt = salt.into();
        if salt.is_empty() {
            return Err(FilterError::EmptySalt);
        }
        Ok(Self {
            algorithm: algorithm.into(),
            salt,
        })
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn salt(&self) -> &str {
        &self.salt
    }
}

/// Name → digest function mapping
///
/// Populated by the caller before any filter is built, then shared
/// read-only (usually behind an `Arc`).
#[derive(Clone, Default)]
pub struct DigestRegistry {
    algorithms: HashMap<String, DigestFn>,
}

fn salted_digest<D: Digest>(item: &[u8], salt: &[u8]) -> Vec<u8> {
    let mut hasher = D::new();
    hasher.update(item);
    hasher.update(salt);
    hasher.finalize().to_vec()
}

impl DigestRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `sha256`, `sha512`, `sha3-256` and `keccak256`
    ///
    /// Each digests `item || salt`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("sha256", salted_digest::<Sha256>);
        registry.register("sha512", salted_digest::<Sha512>);
        registry.register("sha3-256", salted_digest::<Sha3_256>);
        registry.register("keccak256", salted_digest::<Keccak256>);
        registry
    }

    /// Register `f` under `name`, replacing any previous entry
    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&[u8], &[u8]) -> Vec<u8> + Send + Sync + 'static,
    {
        let name = name.into();
        debug!(algorithm = %name, "Registered digest algorithm");
        self.algorithms.insert(name, Arc::new(f));
    }

    pub fn lookup(&self, name: &str) -> Result<&DigestFn> {
        self.algorithms
            .get(name)
            .ok_or_else(|| FilterError::UnknownAlgorithm(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.algorithms.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.algorithms.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for DigestRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestRegistry")
            .field("algorithms", &self.names())
            .finish()
    }
}

/// Reduce a digest to a bit position in `[0, bit_length)`
///
/// Takes the first `ceil(bit_length / 4)` hex nibbles of the digest (the
/// whole digest if it is shorter), reads them as an unsigned big-endian
/// number and reduces it modulo `bit_length`. When `bit_length` is not a
/// multiple of 4 the prefix carries up to 3 extra bits, which the modulo
/// folds back into range. The reduction runs per nibble so no big integer
/// is needed.
pub fn prefix_position(digest: &[u8], bit_length: usize) -> usize {
    debug_assert!(bit_length > 0);
    let nibbles = bit_length.div_ceil(4);
    let modulus = bit_length as u128;

    digest
        .iter()
        .flat_map(|b| [b >> 4, b & 0x0f])
        .take(nibbles)
        .fold(0u128, |acc, nibble| (acc * 16 + u128::from(nibble)) % modulus) as usize
}

/// Hash family made of independently salted digests
#[derive(Clone, Debug)]
pub struct SaltedHashFamily {
    specs: Vec<HashSpec>,
    registry: Arc<DigestRegistry>,
}

impl SaltedHashFamily {
    /// Build a family; every spec must name a registered algorithm
    pub fn new(specs: Vec<HashSpec>, registry: Arc<DigestRegistry>) -> Result<Self> {
        if specs.is_empty() {
            return Err(FilterError::InvalidConfig(
                "salted filter needs at least one hash spec".to_string(),
            ));
        }
        for spec in &specs {
            registry.lookup(spec.algorithm())?;
        }
        Ok(Self { specs, registry })
    }

    pub fn specs(&self) -> &[HashSpec] {
        &self.specs
    }

    pub fn hash_count(&self) -> usize {
        self.specs.len()
    }

    /// True when both families produce identical digests: same specs in the
    /// same order, resolved through the very same registry
    pub fn same_hashes(&self, other: &SaltedHashFamily) -> bool {
        self.specs == other.specs && Arc::ptr_eq(&self.registry, &other.registry)
    }

    /// Append a spec; the caller is responsible for the frozen check
    pub(crate) fn push(&mut self, spec: HashSpec) -> Result<()> {
        self.registry.lookup(spec.algorithm())?;
        self.specs.push(spec);
        Ok(())
    }

    fn raw_digests(&self, item: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.specs
            .iter()
            .map(|spec| {
                let f = self.registry.lookup(spec.algorithm())?;
                Ok(f(item, spec.salt().as_bytes()))
            })
            .collect()
    }

    /// Hex-encoded digests for `item`, one per spec, in spec order
    pub fn digest(&self, item: &[u8]) -> Result<Vec<String>> {
        Ok(self
            .raw_digests(item)?
            .iter()
            .map(hex::encode)
            .collect())
    }

    /// Bit positions for `item` in a filter of `bit_length` bits
    pub fn positions(&self, item: &[u8], bit_length: usize) -> Result<Vec<usize>> {
        Ok(self
            .raw_digests(item)?
            .iter()
            .map(|d| prefix_position(d, bit_length))
            .collect())
    }
}
