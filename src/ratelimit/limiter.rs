//! Sliding-window rate limiter keyed by client identity.
//!
//! Each identity keeps the timestamps of its recent allowed requests. A
//! check counts the timestamps inside the trailing window and rejects once
//! the configured limit is reached. Identities that go quiet are dropped by
//! a sweep that piggybacks on every [`SWEEP_EVERY_CHECKS`]th check instead
//! of running on its own timer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::ratelimit::RateWindow;

/// Identities idle for longer than this are dropped by the sweep.
pub const RETENTION_MS: u64 = 5 * 60 * 1000;

/// One sweep runs per this many checks.
pub const SWEEP_EVERY_CHECKS: u64 = 1000;

// == Rate Limit Config ==
/// Request budget for one protected route or operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitConfig {
    /// Requests allowed per window
    pub limit: u32,
    /// Window length in milliseconds
    pub window_ms: u64,
}

impl RateLimitConfig {
    /// Creates a config; zero values are raised to 1.
    pub fn new(limit: u32, window_ms: u64) -> Self {
        Self {
            limit: limit.max(1),
            window_ms: window_ms.max(1),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: 100,
            window_ms: 60_000,
        }
    }
}

// == Decisions ==
/// Detail attached to a rejected check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitRejection {
    pub limit: u32,
    /// Requests already counted in the current window
    pub current: u32,
    /// Always 0 for a rejection
    pub remaining: u32,
    /// Seconds until the oldest counted request leaves the window
    pub retry_after_seconds: u64,
}

/// Outcome of [`RateLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { limit: u32, remaining: u32 },
    Rejected(RateLimitRejection),
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }
}

// == Rate Limiter ==
#[derive(Debug)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, RateWindow>>,
    clock: Arc<dyn Clock>,
    checks: AtomicU64,
    sweep_every: u64,
    retention_ms: u64,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            clock,
            checks: AtomicU64::new(0),
            sweep_every: SWEEP_EVERY_CHECKS,
            retention_ms: RETENTION_MS,
        }
    }

    /// Overrides how often the sweep runs and how long idle identities are kept.
    pub fn with_sweep_policy(mut self, sweep_every: u64, retention_ms: u64) -> Self {
        self.sweep_every = sweep_every.max(1);
        self.retention_ms = retention_ms;
        self
    }

    // == Check ==
    /// Counts a request from `identity` against `config`.
    ///
    /// An allowed request is recorded; a rejected one is not.
    pub fn check(&self, identity: &str, config: &RateLimitConfig) -> RateLimitDecision {
        let now = self.clock.now_ms();
        let limit = config.limit.max(1);
        let window_ms = config.window_ms.max(1);

        let decision = {
            let mut windows = self.windows.lock();
            let window = windows.entry(identity.to_string()).or_default();
            window.set_window_ms(window_ms);

            window.purge(now.saturating_sub(window_ms));
            let current = window.count() as u32;

            if current >= limit {
                let oldest = window.oldest().unwrap_or(now);
                let wait_ms = oldest.saturating_add(window_ms).saturating_sub(now);
                RateLimitDecision::Rejected(RateLimitRejection {
                    limit,
                    current,
                    remaining: 0,
                    retry_after_seconds: wait_ms.div_ceil(1000).max(1),
                })
            } else {
                window.record(now);
                RateLimitDecision::Allowed {
                    limit,
                    remaining: limit - current - 1,
                }
            }
        };

        if let RateLimitDecision::Rejected(rejection) = &decision {
            debug!(
                identity,
                current = rejection.current,
                limit = rejection.limit,
                "Rate limit exceeded"
            );
        }

        let checks = self.checks.fetch_add(1, Ordering::Relaxed) + 1;
        if checks % self.sweep_every == 0 {
            self.sweep_stale();
        }

        decision
    }

    // == Sweep Stale ==
    /// Drops identities whose newest request is older than their horizon.
    ///
    /// An identity's horizon is the retention period, or its own window
    /// length when that is longer. Returns the number of identities removed.
    pub fn sweep_stale(&self) -> usize {
        let now = self.clock.now_ms();

        let mut windows = self.windows.lock();
        let before = windows.len();
        windows.retain(|_, window| {
            let horizon = self.retention_ms.max(window.window_ms());
            window
                .newest()
                .is_some_and(|newest| now.saturating_sub(newest) <= horizon)
        });
        let removed = before - windows.len();
        drop(windows);

        if removed > 0 {
            debug!(removed, "Rate limiter dropped idle identities");
        }
        removed
    }

    /// Number of identities currently holding a window.
    pub fn tracked_identities(&self) -> usize {
        self.windows.lock().len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
