//! Error types for the task backend core
//!
//! Provides per-concern error enums using thiserror, and the HTTP mapping
//! for errors that reach the API surface.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::ratelimit::RateLimitRejection;

// == Cache Error Enum ==
/// Errors raised by cache write paths.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key is empty
    #[error("Invalid cache key: {0:?}")]
    InvalidKey(String),

    /// Value could not be converted to or from its cached form
    #[error("Cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

// == Store Error Enum ==
/// Errors raised by task store implementations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or refused the operation
    #[error("Task store unavailable: {0}")]
    Unavailable(String),
}

// == Queue Error Enum ==
/// Errors raised when enqueuing a job.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// The queue is at capacity
    #[error("Job queue is full")]
    Full,

    /// The consumer side of the queue has gone away
    #[error("Job queue is closed")]
    Closed,
}

// == Job Error Enum ==
/// Failure reported by a job handler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// The payload is structurally invalid; retrying cannot fix it
    #[error("{0}")]
    InvalidPayload(String),

    /// The referenced task is not in the store yet, or any more
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// A downstream collaborator failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Any other handler failure
    #[error("{0}")]
    Failed(String),
}

impl JobError {
    /// Returns true when redelivering the job could change the result.
    pub fn is_retriable(&self) -> bool {
        !matches!(self, JobError::InvalidPayload(_))
    }
}

// == API Error Enum ==
/// Unified error type for HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Client exceeded its request budget
    #[error("Too many requests")]
    RateLimited(RateLimitRejection),

    /// Cache failure
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Task store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, json!({ "error": self.to_string() })),
            ApiError::InvalidRequest(_) => {
                (StatusCode::BAD_REQUEST, json!({ "error": self.to_string() }))
            }
            ApiError::RateLimited(rejection) => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({
                    "error": self.to_string(),
                    "limit": rejection.limit,
                    "current": rejection.current,
                    "remaining": rejection.remaining,
                    "retryAfter": rejection.retry_after_seconds,
                }),
            ),
            ApiError::Cache(_) | ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": self.to_string() }),
            ),
            ApiError::Store(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": self.to_string() }),
            ),
        };

        let mut response = (status, Json(body)).into_response();
        if let ApiError::RateLimited(rejection) = &self {
            if let Ok(value) = HeaderValue::from_str(&rejection.retry_after_seconds.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

// == Result Type Alias ==
/// Convenience Result type for HTTP handlers.
pub type Result<T, E = ApiError> = std::result::Result<T, E>;
