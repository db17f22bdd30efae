//! Response DTOs for the task API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::{Deserialize, Serialize};

use crate::cache::CacheStats;
use crate::models::Task;
use crate::ratelimit::RateLimitConfig;

// == Task Page ==
/// Paging details attached to a task listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

/// Response body for `GET /tasks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPage {
    pub data: Vec<Task>,
    pub pagination: Pagination,
}

impl TaskPage {
    pub fn new(data: Vec<Task>, page: u32, limit: u32, total: u64) -> Self {
        let limit_wide = u64::from(limit.max(1));
        Self {
            data,
            pagination: Pagination {
                page,
                limit,
                total,
                total_pages: total.div_ceil(limit_wide),
            },
        }
    }
}

/// Response body for `DELETE /tasks/:id`.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The task that was deleted
    pub id: String,
}

impl DeleteResponse {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            message: format!("Task '{}' deleted successfully", id),
            id,
        }
    }
}

// == Stats ==
/// Limiter details reported by `GET /stats`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStats {
    pub tracked_identities: usize,
    #[serde(flatten)]
    pub config: RateLimitConfig,
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub cache: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    pub rate_limit: RateLimitStats,
}

impl StatsResponse {
    pub fn new(cache: CacheStats, tracked_identities: usize, config: RateLimitConfig) -> Self {
        Self {
            hit_rate: cache.hit_rate(),
            cache,
            rate_limit: RateLimitStats {
                tracked_identities,
                config,
            },
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
