//! API Module
//!
//! HTTP handlers, middleware and routing for the task server REST API.
//!
//! # Endpoints
//! - `GET /tasks` - List tasks with filtering and paging
//! - `POST /tasks` - Create a task
//! - `GET /tasks/:id` - Fetch one task
//! - `PATCH /tasks/:id` - Update a task
//! - `DELETE /tasks/:id` - Delete a task
//! - `GET /stats` - Cache and limiter statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use handlers::{AppState, TASKS_CACHE_PREFIX};
pub use middleware::{client_identity, rate_limit_middleware};
pub use routes::create_router;
