//! API Routes
//!
//! Configures the Axum router with all task server endpoints.

use axum::{middleware, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    create_task, delete_task, get_task, health_handler, list_tasks, stats_handler, update_task,
    AppState,
};
use super::middleware::rate_limit_middleware;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /tasks` - List tasks (cached, rate limited)
/// - `POST /tasks` - Create a task (rate limited)
/// - `GET /tasks/:id` - Fetch one task (cached, rate limited)
/// - `PATCH /tasks/:id` - Update a task (rate limited)
/// - `DELETE /tasks/:id` - Delete a task (rate limited)
/// - `GET /stats` - Cache and limiter statistics
/// - `GET /health` - Health check endpoint
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let tasks = Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/:id",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .merge(tasks)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use tower::util::ServiceExt;

    use crate::clock::ManualClock;
    use crate::config::Config;
    use crate::jobs::InMemoryJobQueue;
    use crate::ratelimit::{RateLimitConfig, RateLimiter};
    use crate::store::InMemoryTaskStore;

    fn create_test_app(rate_limit: RateLimitConfig) -> (Router, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let (queue, _rx) = InMemoryJobQueue::new(8);
        let config = Config {
            rate_limit,
            ..Config::default()
        };
        let state = AppState::from_config(
            &config,
            Arc::new(InMemoryTaskStore::new()),
            Arc::new(queue),
        )
        .with_limiter(Arc::new(RateLimiter::with_clock(clock.clone())));
        (create_router(state), clock)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("x-forwarded-for", "198.51.100.7")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (app, _) = create_test_app(RateLimitConfig::default());
        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let (app, _) = create_test_app(RateLimitConfig::default());
        let response = app.oneshot(get("/stats")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let (app, _) = create_test_app(RateLimitConfig::default());
        let response = app.oneshot(get("/tasks/nonexistent")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_tasks_routes_are_rate_limited() {
        let (app, clock) = create_test_app(RateLimitConfig::new(2, 1_000));

        for _ in 0..2 {
            let response = app.clone().oneshot(get("/tasks")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert!(response.headers().contains_key("x-ratelimit-remaining"));
        }

        let response = app.clone().oneshot(get("/tasks")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "1");

        // Health checks are never charged
        let response = app.clone().oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        clock.advance(1_001);
        let response = app.oneshot(get("/tasks")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
