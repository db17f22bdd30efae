//! Built-in job handlers.
//!
//! Payload problems are reported as [`JobError::InvalidPayload`] so they
//! end the job at once. Store failures and missing tasks are retried up to
//! the attempt ceiling.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::error::JobError;
use crate::jobs::processor::{JobHandler, TaskUpdate};
use crate::jobs::Job;
use crate::models::{TaskPatch, TaskStatus};
use crate::store::TaskStore;

/// Reads a required, non-empty string field from the payload.
fn required_str<'a>(job: &'a Job, field: &str) -> Result<&'a str, JobError> {
    match job.payload.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.as_str()),
        Some(_) => Err(JobError::InvalidPayload(format!(
            "Field '{field}' must be a non-empty string"
        ))),
        None => Err(JobError::InvalidPayload(format!(
            "Missing required field: {field}"
        ))),
    }
}

// == Status Update ==
/// Handles `task-status-update`: writes `payload.status` onto `payload.taskId`.
pub struct StatusUpdateHandler {
    store: Arc<dyn TaskStore>,
}

impl StatusUpdateHandler {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl JobHandler for StatusUpdateHandler {
    async fn handle(&self, job: &Job) -> Result<TaskUpdate, JobError> {
        let task_id = required_str(job, "taskId")?;
        let status: TaskStatus = required_str(job, "status")?
            .parse()
            .map_err(JobError::InvalidPayload)?;

        let affected = self
            .store
            .update_by_id(task_id, &TaskPatch::status(status))
            .await?;
        if affected == 0 {
            return Err(JobError::TaskNotFound(task_id.to_string()));
        }

        Ok(TaskUpdate {
            task_id: task_id.to_string(),
            new_status: status,
        })
    }
}

// == Overdue Notification ==
/// Handles `overdue-tasks-notification`: moves the task to `IN_PROGRESS`
/// and logs a warning naming its due date and owner.
pub struct OverdueNotificationHandler {
    store: Arc<dyn TaskStore>,
}

impl OverdueNotificationHandler {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl JobHandler for OverdueNotificationHandler {
    async fn handle(&self, job: &Job) -> Result<TaskUpdate, JobError> {
        let task_id = required_str(job, "taskId")?;

        let task = self
            .store
            .find_by_id(task_id)
            .await?
            .ok_or_else(|| JobError::TaskNotFound(task_id.to_string()))?;

        let new_status = TaskStatus::InProgress;
        let affected = self
            .store
            .update_by_id(task_id, &TaskPatch::status(new_status))
            .await?;
        if affected == 0 {
            return Err(JobError::TaskNotFound(task_id.to_string()));
        }

        warn!(
            task_id = %task.id,
            title = %task.title,
            user_id = %task.user_id,
            due_date = ?task.due_date,
            "Task is overdue"
        );

        Ok(TaskUpdate {
            task_id: task.id,
            new_status,
        })
    }
}
