//! Service Layer
//!
//! Wraps the domain filter for use across threads.

pub mod shared_filter;

pub use shared_filter::SharedBloomFilter;
