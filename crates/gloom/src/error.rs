//! Error types for the filter

use thiserror::Error;

/// Errors that can occur while building or using a filter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("Invalid filter configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown digest algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("Hash configuration is frozen: {inserted} items already inserted")]
    FrozenConfiguration { inserted: usize },

    #[error("Hash spec salt must not be empty")]
    EmptySalt,

    /// Internal invariant violation: positions are always reduced before
    /// they reach the bit vector, so seeing this means a reduction bug.
    #[error("Bit index out of range: {index} >= {length}")]
    IndexOutOfRange { index: usize, length: usize },

    #[error("Incompatible filters: {0}")]
    IncompatibleFilters(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),
}

impl From<serde_json::Error> for FilterError {
    fn from(err: serde_json::Error) -> Self {
        FilterError::ConfigParse(err.to_string())
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, FilterError>;
