//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with TTL expiration and
//! earliest-expiry eviction.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::background::spawn_sweep_task;
use crate::cache::eviction::soonest_expiring;
use crate::cache::stats::{CacheCounters, SAMPLE_KEY_COUNT};
use crate::cache::{CacheEntry, CacheStats};
use crate::clock::{Clock, SystemClock};
use crate::error::CacheError;

/// Entry map and counters, guarded together.
#[derive(Debug)]
struct Inner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    counters: CacheCounters,
}

// == TTL Cache ==
/// Bounded key/value cache with per-entry expiry.
///
/// Every method takes `&self`; the entry map sits behind a mutex that is
/// held only for the lookup and mutation of a single call. Values are
/// moved in on [`set`](Self::set) and cloned out on [`get`](Self::get), so
/// callers never share a value with the cache.
#[derive(Debug)]
pub struct TtlCache<V> {
    inner: Mutex<Inner<V>>,
    max_size: usize,
    clock: Arc<dyn Clock>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl<V> TtlCache<V> {
    // == Constructor ==
    /// Creates a cache holding at most `max_size` entries, using the system clock.
    pub fn new(max_size: usize) -> Self {
        Self::with_clock(max_size, Arc::new(SystemClock))
    }

    /// Creates a cache with an explicit time source.
    ///
    /// `max_size` is clamped to at least 1.
    pub fn with_clock(max_size: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                counters: CacheCounters::default(),
            }),
            max_size: max_size.max(1),
            clock,
            sweeper: Mutex::new(None),
        }
    }

    // == Set ==
    /// Stores `value` under `key` for `ttl_seconds`.
    ///
    /// Overwriting a key resets its TTL. When the cache is full and the key
    /// is new, the entry that expires soonest is evicted first.
    pub fn set(&self, key: impl Into<String>, value: V, ttl_seconds: u64) -> Result<(), CacheError> {
        let key = key.into();
        if key.is_empty() {
            return Err(CacheError::InvalidKey(key));
        }

        let now = self.clock.now_ms();
        let mut inner = self.inner.lock();

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.max_size {
            if let Some(victim) = soonest_expiring(&inner.entries) {
                inner.entries.remove(&victim);
                inner.counters.record_eviction();
                debug!(key = %victim, "Evicted soonest-expiring cache entry");
            }
        }

        inner
            .entries
            .insert(key, CacheEntry::new(value, now, ttl_seconds));
        Ok(())
    }

    // == Has ==
    /// Returns true if `key` holds an unexpired entry.
    ///
    /// An expired entry found here is removed.
    pub fn has(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock();

        match inner.entries.get(key).map(|entry| entry.is_expired(now)) {
            Some(false) => true,
            Some(true) => {
                inner.entries.remove(key);
                inner.counters.record_expirations(1);
                false
            }
            None => false,
        }
    }

    // == Delete ==
    /// Removes an entry by key, returning whether one was present.
    pub fn delete(&self, key: &str) -> bool {
        self.inner.lock().entries.remove(key).is_some()
    }

    // == Delete Prefix ==
    /// Removes every entry whose key starts with `prefix`.
    ///
    /// Walks the full key set, so no matching entry survives. Returns the
    /// number of entries removed.
    pub fn delete_prefix(&self, prefix: &str) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner.entries.retain(|key, _| !key.starts_with(prefix));
        before - inner.entries.len()
    }

    // == Clear ==
    /// Removes all entries unconditionally.
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    // == Stats ==
    /// Returns current size, capacity, a sample of keys and the counters.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            size: inner.entries.len(),
            max_size: self.max_size,
            sample_keys: inner
                .entries
                .keys()
                .take(SAMPLE_KEY_COUNT)
                .cloned()
                .collect(),
            hits: inner.counters.hits,
            misses: inner.counters.misses,
            evictions: inner.counters.evictions,
            expirations: inner.counters.expirations,
        }
    }

    // == Sweep Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - inner.entries.len();
        inner.counters.record_expirations(removed);
        removed
    }

    // == Length ==
    /// Returns the current number of entries, expired or not.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Returns the configured capacity.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    // == Stop Sweep ==
    /// Stops the background sweep if one is running.
    pub fn stop_sweep(&self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
            debug!("Cache sweep stopped");
        }
    }

    /// Returns true while a background sweep is attached to this cache.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl<V: Clone> TtlCache<V> {
    // == Get ==
    /// Retrieves an owned copy of the value stored under `key`.
    ///
    /// Returns None on a miss. An expired entry found here is removed.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock();

        match inner.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                let value = entry.value.clone();
                inner.counters.record_hit();
                Some(value)
            }
            Some(_) => {
                inner.entries.remove(key);
                inner.counters.record_expirations(1);
                inner.counters.record_miss();
                None
            }
            None => {
                inner.counters.record_miss();
                None
            }
        }
    }
}

impl<V: Send + 'static> TtlCache<V> {
    // == Start Sweep ==
    /// Starts a background task that calls [`sweep_expired`](Self::sweep_expired)
    /// every `interval`.
    ///
    /// Replaces any sweep already running. The task holds only a weak
    /// reference and ends once the cache is dropped. Must be called from
    /// within a tokio runtime.
    pub fn start_sweep(self: &Arc<Self>, interval: Duration) {
        let handle = spawn_sweep_task(Arc::downgrade(self), interval);
        if let Some(previous) = self.sweeper.lock().replace(handle) {
            previous.abort();
        }
    }
}

impl TtlCache<serde_json::Value> {
    // == Typed Helpers ==
    /// Serializes `value` to JSON and stores it.
    pub fn set_json<T: Serialize>(
        &self,
        key: impl Into<String>,
        value: &T,
        ttl_seconds: u64,
    ) -> Result<(), CacheError> {
        let value = serde_json::to_value(value)?;
        self.set(key, value, ttl_seconds)
    }

    /// Looks up `key` and deserializes the stored JSON into `T`.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        self.get(key)
            .map(serde_json::from_value)
            .transpose()
            .map_err(CacheError::from)
    }
}

impl<V> Drop for TtlCache<V> {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.get_mut().take() {
            handle.abort();
        }
    }
}
