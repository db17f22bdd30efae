//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the cache invariants under arbitrary operation mixes.

use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::TtlCache;
use crate::clock::{Clock, ManualClock};

// == Test Configuration ==
const TEST_MAX_SIZE: usize = 50;

// == Strategies ==
/// Generates valid cache keys (non-empty)
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_:]{1,32}"
}

/// Generates cache values
fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,64}"
}

/// Generates TTLs in seconds
fn ttl_strategy() -> impl Strategy<Value = u64> {
    1u64..600
}

/// A single operation against the cache, possibly advancing time first.
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String, ttl: u64 },
    Get { key: String },
    Delete { key: String },
    Advance { ms: u64 },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), valid_value_strategy(), ttl_strategy())
            .prop_map(|(key, value, ttl)| CacheOp::Set { key, value, ttl }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Delete { key }),
        (0u64..120_000).prop_map(|ms| CacheOp::Advance { ms }),
    ]
}

fn new_cache(max_size: usize) -> (TtlCache<String>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0));
    (TtlCache::with_clock(max_size, clock.clone()), clock)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Storing a pair and reading it back before expiry yields the same value,
    // and mutating the caller's copy afterwards does not leak into the cache.
    #[test]
    fn prop_roundtrip_is_isolated(
        key in valid_key_strategy(),
        value in valid_value_strategy(),
        ttl in ttl_strategy()
    ) {
        let (cache, _) = new_cache(TEST_MAX_SIZE);

        let mut original = value.clone();
        cache.set(key.clone(), original.clone(), ttl).unwrap();
        original.push_str("-mutated");

        prop_assert_eq!(cache.get(&key), Some(value));
    }

    // Once time passes expires_at the entry is gone, and stats no longer count it.
    #[test]
    fn prop_expired_entries_are_absent(
        key in valid_key_strategy(),
        value in valid_value_strategy(),
        ttl in ttl_strategy(),
        overshoot in 0u64..10_000
    ) {
        let (cache, clock) = new_cache(TEST_MAX_SIZE);

        cache.set(key.clone(), value, ttl).unwrap();
        clock.advance(ttl * 1000 + overshoot);

        prop_assert_eq!(cache.get(&key), None);
        prop_assert_eq!(cache.stats().size, 0);
        prop_assert!(!cache.stats().sample_keys.contains(&key));
    }

    // No sequence of operations leaves the cache above its capacity.
    #[test]
    fn prop_capacity_enforcement(ops in prop::collection::vec(cache_op_strategy(), 1..300)) {
        let (cache, clock) = new_cache(TEST_MAX_SIZE);

        for op in ops {
            match op {
                CacheOp::Set { key, value, ttl } => {
                    cache.set(key, value, ttl).unwrap();
                }
                CacheOp::Get { key } => {
                    let _ = cache.get(&key);
                }
                CacheOp::Delete { key } => {
                    cache.delete(&key);
                }
                CacheOp::Advance { ms } => clock.advance(ms),
            }
            prop_assert!(
                cache.len() <= TEST_MAX_SIZE,
                "Cache size {} exceeds max {}",
                cache.len(),
                TEST_MAX_SIZE
            );
        }
    }

    // Filling to capacity and adding one more distinct key evicts the entry
    // with the smallest expires_at.
    #[test]
    fn prop_evicts_smallest_expiry(
        ttls in prop::collection::vec(ttl_strategy(), 2..20),
        new_ttl in ttl_strategy()
    ) {
        let capacity = ttls.len();
        let (cache, clock) = new_cache(capacity);

        let mut expiries: HashMap<String, u64> = HashMap::new();
        for (i, ttl) in ttls.iter().enumerate() {
            let key = format!("key_{i:02}");
            cache.set(key.clone(), format!("value_{i}"), *ttl).unwrap();
            expiries.insert(key, clock.now_ms() + ttl * 1000);
            clock.advance(1);
        }

        let min_expiry = *expiries.values().min().unwrap();
        let expected_victim = expiries
            .iter()
            .filter(|(_, exp)| **exp == min_expiry)
            .map(|(key, _)| key.clone())
            .min()
            .unwrap();

        cache.set("incoming".to_string(), "new".to_string(), new_ttl).unwrap();

        prop_assert_eq!(cache.len(), capacity);
        prop_assert!(!cache.has(&expected_victim), "expected {} to be evicted", expected_victim);
        prop_assert!(cache.has("incoming"));
        for key in expiries.keys().filter(|k| **k != expected_victim) {
            prop_assert!(cache.has(key), "{} should have survived", key);
        }
    }

    // Hit and miss counters track get outcomes exactly.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..100)) {
        let (cache, clock) = new_cache(TEST_MAX_SIZE);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value, ttl } => {
                    cache.set(key, value, ttl).unwrap();
                }
                CacheOp::Get { key } => match cache.get(&key) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Delete { key } => {
                    cache.delete(&key);
                }
                CacheOp::Advance { ms } => clock.advance(ms),
            }
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.size, cache.len(), "Size mismatch");
    }

    // Prefix invalidation leaves no matching key behind, however many exist.
    #[test]
    fn prop_delete_prefix_is_complete(
        task_ids in prop::collection::hash_set("[a-z0-9]{1,8}", 0..40),
        other in prop::collection::hash_set("[a-z0-9]{1,8}", 0..10)
    ) {
        let (cache, _) = new_cache(200);

        for id in &task_ids {
            cache.set(format!("tasks:{id}"), id.clone(), 60).unwrap();
        }
        for id in &other {
            cache.set(format!("users:{id}"), id.clone(), 60).unwrap();
        }

        prop_assert_eq!(cache.delete_prefix("tasks:"), task_ids.len());
        prop_assert_eq!(cache.len(), other.len());
    }
}
