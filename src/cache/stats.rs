//! Cache Statistics Module
//!
//! Tracks cache performance metrics and the snapshot returned by `stats()`.

use serde::Serialize;

/// Number of keys exposed in a stats snapshot.
pub const SAMPLE_KEY_COUNT: usize = 10;

// == Cache Counters ==
/// Running counters kept alongside the entry map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheCounters {
    /// Number of successful lookups
    pub hits: u64,
    /// Number of lookups that found nothing or an expired entry
    pub misses: u64,
    /// Number of entries removed to make room
    pub evictions: u64,
    /// Number of entries removed because their TTL elapsed
    pub expirations: u64,
}

impl CacheCounters {
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }
}

// == Cache Stats ==
/// Point-in-time view of the cache.
///
/// `sample_keys` holds at most [`SAMPLE_KEY_COUNT`] keys and is not a
/// complete listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Current number of entries
    pub size: usize,
    /// Configured capacity
    pub max_size: usize,
    /// A partial sample of the stored keys
    pub sample_keys: Vec<String>,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
