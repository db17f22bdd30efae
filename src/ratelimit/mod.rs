//! Rate Limiter Module
//!
//! Per-identity sliding-window request counting.

mod limiter;
mod window;

pub use limiter::{
    RateLimitConfig, RateLimitDecision, RateLimitRejection, RateLimiter, RETENTION_MS,
    SWEEP_EVERY_CHECKS,
};
pub use window::RateWindow;
