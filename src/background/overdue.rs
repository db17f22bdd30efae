//! Overdue Task Scanner
//!
//! Periodically finds tasks past their due date and raises one
//! `overdue-tasks-notification` job for each.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::jobs::{enqueue_best_effort, JobQueue, OVERDUE_TASKS_NOTIFICATION};
use crate::models::{SortDirection, SortField, SortOrder, TaskFilter, TaskStatus};
use crate::store::TaskStore;

/// Tasks fetched per store round trip.
const SCAN_PAGE_SIZE: usize = 100;

/// Enqueues a notification job for every unfinished task due before `now`.
///
/// Returns the number of jobs enqueued. Enqueue failures are logged and
/// skipped; store failures end the scan.
pub async fn scan_overdue(
    store: &dyn TaskStore,
    queue: &dyn JobQueue,
    now: DateTime<Utc>,
) -> Result<usize, StoreError> {
    let filter = TaskFilter {
        exclude_status: Some(TaskStatus::Completed),
        due_before: Some(now),
        ..TaskFilter::default()
    };
    let order = SortOrder::new(SortField::DueDate, SortDirection::Asc);

    let mut skip = 0;
    let mut enqueued = 0;
    loop {
        let (page, total) = store.find_page(&filter, skip, SCAN_PAGE_SIZE, order).await?;
        if page.is_empty() {
            break;
        }
        skip += page.len();

        for task in page {
            let payload = match json!({
                "taskId": task.id,
                "dueDate": task.due_date,
                "userId": task.user_id,
            }) {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            if enqueue_best_effort(queue, OVERDUE_TASKS_NOTIFICATION, payload)
                .await
                .is_some()
            {
                enqueued += 1;
            }
        }

        if skip as u64 >= total {
            break;
        }
    }

    Ok(enqueued)
}

/// Spawns a background task running [`scan_overdue`] every `interval`.
pub fn spawn_overdue_scanner(
    store: Arc<dyn TaskStore>,
    queue: Arc<dyn JobQueue>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "Starting overdue task scanner");

        loop {
            tokio::time::sleep(interval).await;

            match scan_overdue(store.as_ref(), queue.as_ref(), Utc::now()).await {
                Ok(0) => debug!("Overdue scan: no overdue tasks"),
                Ok(count) => info!(count, "Overdue scan enqueued notifications"),
                Err(err) => warn!(error = %err, "Overdue scan failed"),
            }
        }
    })
}
