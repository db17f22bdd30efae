//! Cache Module
//!
//! Provides an in-memory response cache with TTL expiration and
//! earliest-expiry eviction.

mod entry;
mod eviction;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use eviction::soonest_expiring;
pub use stats::{CacheCounters, CacheStats, SAMPLE_KEY_COUNT};
pub use store::TtlCache;
