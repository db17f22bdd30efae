//! Taskguard - caching, rate limiting and background jobs for a task API
//!
//! Provides a TTL response cache, a sliding-window rate limiter and a
//! retrying job processor, wired together behind an Axum HTTP surface.

pub mod api;
pub mod background;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod jobs;
pub mod models;
pub mod ratelimit;
pub mod store;

pub use api::{create_router, AppState};
pub use cache::TtlCache;
pub use config::Config;
pub use jobs::{JobProcessor, JobWorker};
pub use ratelimit::RateLimiter;
