//! Filter configuration and validation
//!
//! # Example
//!
//! ```
//! use gloom::domain::{BloomConfigBuilder, HashSpec};
//!
//! let config = BloomConfigBuilder::new()
//!     .expected_items(10)
//!     .bit_length(48)
//!     .hash_spec(HashSpec::new("sha256", "asd").unwrap())
//!     .hash_spec(HashSpec::new("sha256", "asdasda").unwrap())
//!     .build()
//!     .expect("valid config");
//! assert_eq!(config.hashes.hash_count(), 2);
//! ```

use serde::{Deserialize, Serialize};

use super::hash_functions::MultiHashFamily;
use super::parameters::calculate_optimal_parameters;
use super::salted::HashSpec;
use crate::error::{FilterError, Result};

/// Bit length used when none is given
pub const DEFAULT_BIT_LENGTH: usize = 32;
/// Hash count used for multihash filters when none is given
pub const DEFAULT_HASH_COUNT: usize = 3;

/// Which hash family a filter uses
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum HashConfig {
    /// k digests derived from one 32-bit hash
    #[serde(rename = "multihash")]
    MultiHash { hash_count: usize },
    /// One digest per (algorithm, salt) pair
    Salted { specs: Vec<HashSpec> },
}

impl HashConfig {
    pub fn hash_count(&self) -> usize {
        match self {
            HashConfig::MultiHash { hash_count } => *hash_count,
            HashConfig::Salted { specs } => specs.len(),
        }
    }
}

/// Filter configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloomConfig {
    /// Number of items the filter is sized for
    #[serde(default)]
    pub expected_items: usize,
    /// Size of the bit vector (m)
    pub bit_length: usize,
    pub hashes: HashConfig,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            expected_items: 0,
            bit_length: DEFAULT_BIT_LENGTH,
            hashes: HashConfig::MultiHash {
                hash_count: DEFAULT_HASH_COUNT,
            },
        }
    }
}

impl BloomConfig {
    pub fn validate(&self) -> Result<()> {
        if self.bit_length == 0 {
            return Err(FilterError::InvalidConfig(
                "bit_length cannot be 0".to_string(),
            ));
        }

        match &self.hashes {
            HashConfig::MultiHash { hash_count } => {
                if self.bit_length > MultiHashFamily::MAX_BIT_LENGTH {
                    return Err(FilterError::InvalidConfig(format!(
                        "multihash bit_length {} exceeds {}",
                        self.bit_length,
                        MultiHashFamily::MAX_BIT_LENGTH
                    )));
                }
                if *hash_count == 0 {
                    return Err(FilterError::InvalidConfig(
                        "hash_count cannot be 0".to_string(),
                    ));
                }
            }
            HashConfig::Salted { specs } => {
                if specs.is_empty() {
                    return Err(FilterError::InvalidConfig(
                        "salted filter needs at least one hash spec".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: BloomConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Fluent builder for [`BloomConfig`]
///
/// Adding any hash spec selects the salted family; otherwise the multihash
/// family is used. With `target_fpr` set, the unset bit length and hash
/// count are sized from `expected_items`.
#[derive(Default)]
pub struct BloomConfigBuilder {
    expected_items: Option<usize>,
    bit_length: Option<usize>,
    hash_count: Option<usize>,
    specs: Vec<HashSpec>,
    target_fpr: Option<f64>,
}

impl BloomConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expected_items(mut self, n: usize) -> Self {
        self.expected_items = Some(n);
        self
    }

    pub fn bit_length(mut self, bits: usize) -> Self {
        self.bit_length = Some(bits);
        self
    }

    /// Hash count for the multihash family
    pub fn hash_count(mut self, k: usize) -> Self {
        self.hash_count = Some(k);
        self
    }

    pub fn hash_spec(mut self, spec: HashSpec) -> Self {
        self.specs.push(spec);
        self
    }

    pub fn hash_specs(mut self, specs: impl IntoIterator<Item = HashSpec>) -> Self {
        self.specs.extend(specs);
        self
    }

    pub fn target_fpr(mut self, fpr: f64) -> Self {
        self.target_fpr = Some(fpr);
        self
    }

    /// Build the configuration, validating all parameters
    pub fn build(self) -> Result<BloomConfig> {
        let expected_items = self.expected_items.unwrap_or(0);

        let sized = match self.target_fpr {
            Some(fpr) if fpr > 0.0 && fpr < 1.0 => {
                Some(calculate_optimal_parameters(expected_items, fpr))
            }
            Some(fpr) => {
                return Err(FilterError::InvalidConfig(format!(
                    "target_fpr {} must be between 0 and 1",
                    fpr
                )))
            }
            None => None,
        };

        let hashes = if self.specs.is_empty() {
            let hash_count = self
                .hash_count
                .or(sized.as_ref().map(|p| p.hash_count))
                .unwrap_or(DEFAULT_HASH_COUNT);
            HashConfig::MultiHash { hash_count }
        } else {
            if self.hash_count.is_some() {
                return Err(FilterError::InvalidConfig(
                    "hash_count and hash specs are mutually exclusive".to_string(),
                ));
            }
            HashConfig::Salted { specs: self.specs }
        };

        let config = BloomConfig {
            expected_items,
            bit_length: self
                .bit_length
                .or(sized.map(|p| p.size_bits))
                .unwrap_or(DEFAULT_BIT_LENGTH),
            hashes,
        };

        config.validate()?;
        Ok(config)
    }
}
