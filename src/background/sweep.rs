//! Cache Sweep Task
//!
//! Background task that periodically removes expired cache entries.

use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::TtlCache;

/// Spawns a background task that periodically sweeps expired cache entries.
///
/// The task sleeps for `interval` between runs. It holds only a weak
/// reference to the cache and exits once the cache has been dropped, so the
/// cache's own lifetime is never extended by its sweeper.
///
/// Usually reached through [`TtlCache::start_sweep`], which keeps the
/// returned handle so the sweep can be stopped with [`TtlCache::stop_sweep`].
pub fn spawn_sweep_task<V: Send + 'static>(
    cache: Weak<TtlCache<V>>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "Starting cache sweep task");

        loop {
            tokio::time::sleep(interval).await;

            let Some(cache) = cache.upgrade() else {
                debug!("Cache dropped, sweep task exiting");
                return;
            };

            let removed = cache.sweep_expired();
            if removed > 0 {
                info!(removed, remaining = cache.len(), "Cache sweep removed expired entries");
            } else {
                debug!("Cache sweep: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::clock::ManualClock;

    const INTERVAL: Duration = Duration::from_millis(60_000);

    fn cache_with_clock() -> (Arc<TtlCache<String>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        (Arc::new(TtlCache::with_clock(100, clock.clone())), clock)
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_expired_entries() {
        let (cache, clock) = cache_with_clock();
        cache.set("expire_soon", "value".to_string(), 1).unwrap();
        cache.set("long_lived", "value".to_string(), 3600).unwrap();

        cache.start_sweep(INTERVAL);
        clock.advance(2_000);

        // Nothing is removed before the first tick
        tokio::time::sleep(INTERVAL / 2).await;
        assert_eq!(cache.len(), 2);

        tokio::time::sleep(INTERVAL).await;
        assert_eq!(cache.len(), 1, "Expired entry should have been swept");
        assert!(cache.has("long_lived"));

        cache.stop_sweep();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_preserves_valid_entries() {
        let (cache, clock) = cache_with_clock();
        cache.set("long_lived", "value".to_string(), 3600).unwrap();

        cache.start_sweep(INTERVAL);
        clock.advance(10_000);
        tokio::time::sleep(INTERVAL * 3).await;

        assert_eq!(cache.get("long_lived"), Some("value".to_string()));
        cache.stop_sweep();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_can_be_stopped() {
        let (cache, clock) = cache_with_clock();
        cache.set("expire_soon", "value".to_string(), 1).unwrap();

        cache.start_sweep(INTERVAL);
        assert!(cache.is_sweeping());
        cache.stop_sweep();
        assert!(!cache.is_sweeping());

        clock.advance(5_000);
        tokio::time::sleep(INTERVAL * 2).await;

        // Still stored: no sweep ran and nothing touched the key
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_exits_when_cache_dropped() {
        let (cache, _) = cache_with_clock();
        let handle = spawn_sweep_task(Arc::downgrade(&cache), INTERVAL);

        drop(cache);
        tokio::time::sleep(INTERVAL * 2).await;

        assert!(handle.is_finished(), "Task should exit after the cache is gone");
    }
}
