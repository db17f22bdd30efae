//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;

use crate::ratelimit::RateLimitConfig;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Maximum number of entries the response cache can hold
    pub cache_max_size: usize,
    /// Interval between background cache sweeps in milliseconds
    pub cache_sweep_interval_ms: u64,
    /// TTL in seconds applied to cached task responses
    pub cache_ttl_seconds: u64,
    /// Default request budget applied to protected routes
    pub rate_limit: RateLimitConfig,
    /// Maximum number of jobs processed at the same time
    pub job_concurrency: usize,
    /// Capacity of the in-memory job queue
    pub job_queue_capacity: usize,
    /// Base delay before a retriable job is redelivered
    pub job_retry_delay_ms: u64,
    /// Interval between overdue task scans in seconds
    pub overdue_scan_interval_secs: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_MAX_SIZE` - Maximum cache entries (default: 1000)
    /// - `CACHE_SWEEP_INTERVAL_MS` - Cache sweep frequency (default: 60000)
    /// - `CACHE_TTL_SECONDS` - TTL for cached task responses (default: 300)
    /// - `RATE_LIMIT` - Requests allowed per window (default: 100)
    /// - `RATE_LIMIT_WINDOW_MS` - Rate limit window (default: 60000)
    /// - `JOB_CONCURRENCY` - Concurrent job deliveries (default: 5)
    /// - `JOB_QUEUE_CAPACITY` - Job queue capacity (default: 1024)
    /// - `JOB_RETRY_DELAY_MS` - Base redelivery delay (default: 1000)
    /// - `OVERDUE_SCAN_INTERVAL_SECS` - Overdue scan frequency (default: 3600)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let rate_limit = RateLimitConfig::new(
            env_or("RATE_LIMIT", defaults.rate_limit.limit),
            env_or("RATE_LIMIT_WINDOW_MS", defaults.rate_limit.window_ms),
        );

        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cache_max_size: env_or("CACHE_MAX_SIZE", defaults.cache_max_size),
            cache_sweep_interval_ms: env_or(
                "CACHE_SWEEP_INTERVAL_MS",
                defaults.cache_sweep_interval_ms,
            ),
            cache_ttl_seconds: env_or("CACHE_TTL_SECONDS", defaults.cache_ttl_seconds),
            rate_limit,
            job_concurrency: env_or("JOB_CONCURRENCY", defaults.job_concurrency),
            job_queue_capacity: env_or("JOB_QUEUE_CAPACITY", defaults.job_queue_capacity),
            job_retry_delay_ms: env_or("JOB_RETRY_DELAY_MS", defaults.job_retry_delay_ms),
            overdue_scan_interval_secs: env_or(
                "OVERDUE_SCAN_INTERVAL_SECS",
                defaults.overdue_scan_interval_secs,
            ),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            cache_max_size: 1000,
            cache_sweep_interval_ms: 60_000,
            cache_ttl_seconds: 300,
            rate_limit: RateLimitConfig::default(),
            job_concurrency: 5,
            job_queue_capacity: 1024,
            job_retry_delay_ms: 1000,
            overdue_scan_interval_secs: 3600,
        }
    }
}

/// Reads and parses an environment variable, falling back to `default`.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
