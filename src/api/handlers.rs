//! API Handlers
//!
//! HTTP request handlers for the task endpoints. Reads go through the
//! response cache; writes go to the store, invalidate every cached task
//! response and raise background jobs.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderName, HeaderValue, StatusCode},
    Json,
};
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::cache::TtlCache;
use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::jobs::{enqueue_best_effort, JobQueue, TASK_STATUS_UPDATE};
use crate::models::{
    CreateTaskRequest, DeleteResponse, HealthResponse, ListTasksQuery, SortOrder, StatsResponse,
    Task, TaskPage, UpdateTaskRequest,
};
use crate::ratelimit::{RateLimitConfig, RateLimiter};
use crate::store::TaskStore;

/// Prefix shared by every cached task response.
pub const TASKS_CACHE_PREFIX: &str = "tasks:";

/// Response header telling whether a body came from the cache.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Response cache for task reads
    pub cache: Arc<TtlCache<Value>>,
    pub limiter: Arc<RateLimiter>,
    pub store: Arc<dyn TaskStore>,
    pub queue: Arc<dyn JobQueue>,
    /// TTL applied to cached task responses
    pub cache_ttl_seconds: u64,
    /// Budget applied to the `/tasks` routes
    pub rate_limit: RateLimitConfig,
    /// Bumped by every task invalidation
    invalidations: Arc<Mutex<u64>>,
}

impl AppState {
    /// Creates a new AppState from configuration.
    ///
    /// The cache and limiter are created here; the store and queue are
    /// supplied by the caller.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn TaskStore>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            cache: Arc::new(TtlCache::new(config.cache_max_size)),
            limiter: Arc::new(RateLimiter::new()),
            store,
            queue,
            cache_ttl_seconds: config.cache_ttl_seconds,
            rate_limit: config.rate_limit,
            invalidations: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_cache(mut self, cache: Arc<TtlCache<Value>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    /// Looks `key` up in the cache, falling back to `load` on a miss.
    ///
    /// A cached value that no longer decodes is treated as a miss. Cache
    /// write failures are logged and do not fail the request.
    ///
    /// A value loaded while a task write invalidated the cache is returned
    /// but not stored, so a slow read cannot reinstall a pre-write body.
    async fn cached<T, F, Fut>(&self, key: &str, load: F) -> Result<(T, bool)>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        match self.cache.get_json::<T>(key) {
            Ok(Some(hit)) => return Ok((hit, true)),
            Ok(None) => {}
            Err(err) => warn!(key, error = %err, "Discarding undecodable cache entry"),
        }

        let generation = *self.invalidations.lock();
        let value = load().await?;

        let invalidations = self.invalidations.lock();
        if *invalidations != generation {
            debug!(key, "Skipping cache fill raced by an invalidation");
        } else if let Err(err) = self.cache.set_json(key, &value, self.cache_ttl_seconds) {
            warn!(key, error = %err, "Failed to cache response");
        }
        drop(invalidations);

        Ok((value, false))
    }

    fn invalidate_tasks(&self) {
        let mut invalidations = self.invalidations.lock();
        *invalidations = invalidations.wrapping_add(1);
        let removed = self.cache.delete_prefix(TASKS_CACHE_PREFIX);
        drop(invalidations);
        debug!(removed, "Invalidated cached task responses");
    }
}

fn cache_header(hit: bool) -> [(HeaderName, HeaderValue); 1] {
    let value = if hit { "HIT" } else { "MISS" };
    [(X_CACHE, HeaderValue::from_static(value))]
}

fn not_found(id: &str) -> ApiError {
    ApiError::NotFound(format!("Task '{id}'"))
}

/// Handler for GET /tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<ListTasksQuery>,
) -> Result<([(HeaderName, HeaderValue); 1], Json<TaskPage>)> {
    let key = query.cache_key(TASKS_CACHE_PREFIX);

    let (page, hit) = state
        .cached(&key, || async {
            let (tasks, total) = state
                .store
                .find_page(
                    &query.filter(),
                    query.skip(),
                    query.limit() as usize,
                    SortOrder::default(),
                )
                .await?;
            Ok::<_, ApiError>(TaskPage::new(tasks, query.page(), query.limit(), total))
        })
        .await?;

    Ok((cache_header(hit), Json(page)))
}

/// Handler for GET /tasks/:id
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<([(HeaderName, HeaderValue); 1], Json<Task>)> {
    let key = format!("{TASKS_CACHE_PREFIX}{id}");

    let (task, hit) = state
        .cached(&key, || async {
            state
                .store
                .find_by_id(&id)
                .await?
                .ok_or_else(|| not_found(&id))
        })
        .await?;

    Ok((cache_header(hit), Json(task)))
}

/// Handler for POST /tasks
pub async fn create_task(
    State(state): State<AppState>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>)> {
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let task = state.store.create(req.into_new_task()).await?;
    state.invalidate_tasks();

    Ok((StatusCode::CREATED, Json(task)))
}

/// Handler for PATCH /tasks/:id
///
/// When the status changes, a `task-status-update` job is enqueued. A
/// failed enqueue is logged and does not undo the update.
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Task>> {
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let existing = state
        .store
        .find_by_id(&id)
        .await?
        .ok_or_else(|| not_found(&id))?;

    let patch = req.into_patch();
    if state.store.update_by_id(&id, &patch).await? == 0 {
        return Err(not_found(&id));
    }
    state.invalidate_tasks();

    if let Some(status) = patch.status.filter(|s| *s != existing.status) {
        let payload = match json!({ "taskId": id, "status": status }) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        enqueue_best_effort(state.queue.as_ref(), TASK_STATUS_UPDATE, payload).await;
    }

    let updated = state
        .store
        .find_by_id(&id)
        .await?
        .ok_or_else(|| not_found(&id))?;
    Ok(Json(updated))
}

/// Handler for DELETE /tasks/:id
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if state.store.delete_by_id(&id).await? == 0 {
        return Err(not_found(&id));
    }
    state.invalidate_tasks();

    Ok(Json(DeleteResponse::new(id)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.cache.stats(),
        state.limiter.tracked_identities(),
        state.rate_limit,
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueueError;
    use crate::jobs::InMemoryJobQueue;
    use crate::models::{NewTask, TaskStatus};
    use crate::store::InMemoryTaskStore;

    struct ClosedQueue;

    #[async_trait::async_trait]
    impl JobQueue for ClosedQueue {
        async fn enqueue(
            &self,
            _kind: &str,
            _payload: Map<String, Value>,
        ) -> std::result::Result<String, QueueError> {
            Err(QueueError::Closed)
        }
    }

    async fn state_with_task(queue: Arc<dyn JobQueue>) -> (AppState, Arc<InMemoryTaskStore>, Task) {
        let store = Arc::new(InMemoryTaskStore::new());
        let task = store.insert(NewTask::new("write docs", "u-1")).await.unwrap();
        let state = AppState::from_config(&Config::default(), store.clone(), queue);
        (state, store, task)
    }

    fn status_request(status: TaskStatus) -> UpdateTaskRequest {
        UpdateTaskRequest {
            status: Some(status),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_get_task_is_cached() {
        let (queue, _rx) = InMemoryJobQueue::new(4);
        let (state, _, task) = state_with_task(Arc::new(queue)).await;

        let (headers, Json(first)) = get_task(State(state.clone()), Path(task.id.clone()))
            .await
            .unwrap();
        assert_eq!(headers[0].1, "MISS");
        assert_eq!(first, task);

        let (headers, Json(second)) = get_task(State(state.clone()), Path(task.id.clone()))
            .await
            .unwrap();
        assert_eq!(headers[0].1, "HIT");
        assert_eq!(second, task);
        assert!(state.cache.has(&format!("tasks:{}", task.id)));
    }

    #[tokio::test]
    async fn test_read_overlapping_a_write_is_not_cached() {
        let (queue, _rx) = InMemoryJobQueue::new(4);
        let (state, _, task) = state_with_task(Arc::new(queue)).await;
        let key = format!("tasks:{}", task.id);

        let (stale, hit) = state
            .cached(&key, || async {
                let loaded = task.clone();
                state.invalidate_tasks();
                Ok(loaded)
            })
            .await
            .unwrap();
        assert!(!hit);
        assert_eq!(stale, task);
        assert!(!state.cache.has(&key));

        let (_, hit) = state.cached(&key, || async { Ok(task.clone()) }).await.unwrap();
        assert!(!hit);
        assert!(state.cache.has(&key));
    }

    #[tokio::test]
    async fn test_get_missing_task() {
        let (queue, _rx) = InMemoryJobQueue::new(4);
        let (state, _, _) = state_with_task(Arc::new(queue)).await;

        let result = get_task(State(state.clone()), Path("nope".to_string())).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
        assert!(!state.cache.has("tasks:nope"));
    }

    #[tokio::test]
    async fn test_create_task_invalidates_listings() {
        let (queue, _rx) = InMemoryJobQueue::new(4);
        let (state, _, _) = state_with_task(Arc::new(queue)).await;

        let (_, Json(before)) = list_tasks(State(state.clone()), Query(ListTasksQuery::default()))
            .await
            .unwrap();
        assert_eq!(before.pagination.total, 1);

        let req: CreateTaskRequest =
            serde_json::from_value(serde_json::json!({ "title": "review", "userId": "u-2" }))
                .unwrap();
        let (status, Json(created)) = create_task(State(state.clone()), Json(req)).await.unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.user_id, "u-2");

        let (headers, Json(after)) =
            list_tasks(State(state.clone()), Query(ListTasksQuery::default()))
                .await
                .unwrap();
        assert_eq!(headers[0].1, "MISS");
        assert_eq!(after.pagination.total, 2);
    }

    #[tokio::test]
    async fn test_update_invalidates_and_enqueues() {
        let (queue, mut rx) = InMemoryJobQueue::new(4);
        let (state, _, task) = state_with_task(Arc::new(queue)).await;

        get_task(State(state.clone()), Path(task.id.clone())).await.unwrap();
        list_tasks(State(state.clone()), Query(ListTasksQuery::default()))
            .await
            .unwrap();
        assert_eq!(state.cache.len(), 2);

        let Json(updated) = update_task(
            State(state.clone()),
            Path(task.id.clone()),
            Json(status_request(TaskStatus::Completed)),
        )
        .await
        .unwrap();

        assert_eq!(updated.status, TaskStatus::Completed);
        assert!(state.cache.is_empty());

        let job = rx.recv().await.unwrap();
        assert_eq!(job.kind, TASK_STATUS_UPDATE);
        assert_eq!(job.task_id(), Some(task.id.as_str()));
        assert_eq!(job.payload["status"], "COMPLETED");
    }

    #[tokio::test]
    async fn test_update_without_status_change_enqueues_nothing() {
        let (queue, mut rx) = InMemoryJobQueue::new(4);
        let (state, _, task) = state_with_task(Arc::new(queue)).await;

        update_task(
            State(state.clone()),
            Path(task.id.clone()),
            Json(status_request(TaskStatus::Pending)),
        )
        .await
        .unwrap();

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_update_survives_enqueue_failure() {
        let (state, store, task) = state_with_task(Arc::new(ClosedQueue)).await;

        let result = update_task(
            State(state),
            Path(task.id.clone()),
            Json(status_request(TaskStatus::InProgress)),
        )
        .await;

        assert!(result.is_ok());
        let stored = store.find_by_id(&task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::InProgress);
    }

    #[tokio::test]
    async fn test_update_rejects_empty_patch() {
        let (queue, _rx) = InMemoryJobQueue::new(4);
        let (state, _, task) = state_with_task(Arc::new(queue)).await;

        let result = update_task(
            State(state),
            Path(task.id),
            Json(UpdateTaskRequest::default()),
        )
        .await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_delete_task() {
        let (queue, _rx) = InMemoryJobQueue::new(4);
        let (state, store, task) = state_with_task(Arc::new(queue)).await;

        delete_task(State(state.clone()), Path(task.id.clone()))
            .await
            .unwrap();
        assert!(store.find_by_id(&task.id).await.unwrap().is_none());

        let again = delete_task(State(state), Path(task.id)).await;
        assert!(matches!(again, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_store_outage_maps_to_store_error() {
        let (queue, _rx) = InMemoryJobQueue::new(4);
        let (state, store, task) = state_with_task(Arc::new(queue)).await;
        store.set_offline(true);

        let result = get_task(State(state), Path(task.id)).await;
        assert!(matches!(result, Err(ApiError::Store(_))));
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
