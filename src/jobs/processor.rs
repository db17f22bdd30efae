//! Job dispatch and retry classification.
//!
//! The processor turns one delivery into a [`JobOutcome`]. It never
//! redelivers anything itself; the queue side reads the outcome and decides.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::error::JobError;
use crate::jobs::handlers::{OverdueNotificationHandler, StatusUpdateHandler};
use crate::jobs::{
    Job, JobOutcome, JobReport, MAX_ATTEMPTS, OVERDUE_TASKS_NOTIFICATION, TASK_STATUS_UPDATE,
};
use crate::models::TaskStatus;
use crate::store::TaskStore;

/// Error text for a job whose kind has no handler.
pub const UNKNOWN_KIND: &str = "unknown kind";

/// Error text once a job has used up its retries.
pub const MAX_RETRIES_EXCEEDED: &str = "max retries exceeded";

/// What a handler changed on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskUpdate {
    pub task_id: String,
    pub new_status: TaskStatus,
}

/// Work for one job kind.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> Result<TaskUpdate, JobError>;
}

// == Job Processor ==
/// Dispatches jobs to the handler registered for their kind.
///
/// Holds no per-job state, so one instance can serve concurrent deliveries.
#[derive(Clone)]
pub struct JobProcessor {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
    max_attempts: u32,
}

impl JobProcessor {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            max_attempts: MAX_ATTEMPTS,
        }
    }

    /// Creates a processor with the status-update and overdue handlers registered.
    pub fn with_builtin_handlers(store: Arc<dyn TaskStore>) -> Self {
        Self::new()
            .register(TASK_STATUS_UPDATE, StatusUpdateHandler::new(store.clone()))
            .register(OVERDUE_TASKS_NOTIFICATION, OverdueNotificationHandler::new(store))
    }

    /// Registers `handler` for `kind`, replacing any previous one.
    pub fn register(mut self, kind: impl Into<String>, handler: impl JobHandler + 'static) -> Self {
        self.handlers.insert(kind.into(), Arc::new(handler));
        self
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    // == Handle ==
    /// Runs one delivery of `job` and classifies the result.
    pub async fn handle(&self, job: &Job) -> JobOutcome {
        let Some(handler) = self.handlers.get(&job.kind) else {
            warn!(job_id = %job.id, kind = %job.kind, "No handler for job kind");
            return JobOutcome::TerminalFailure(JobReport::failed(job, UNKNOWN_KIND));
        };

        match handler.handle(job).await {
            Ok(update) => {
                info!(
                    job_id = %job.id,
                    kind = %job.kind,
                    task_id = %update.task_id,
                    new_status = %update.new_status,
                    "Job completed"
                );
                JobOutcome::Success(JobReport::succeeded(job, update.task_id, update.new_status))
            }
            Err(err) if !err.is_retriable() => {
                warn!(job_id = %job.id, kind = %job.kind, error = %err, "Job rejected");
                JobOutcome::TerminalFailure(JobReport::failed(job, err.to_string()))
            }
            Err(err) if job.attempts_made < self.max_attempts => {
                warn!(
                    job_id = %job.id,
                    kind = %job.kind,
                    attempts_made = job.attempts_made,
                    error = %err,
                    "Job failed, will be retried"
                );
                JobOutcome::RetriableFailure {
                    error: err.to_string(),
                }
            }
            Err(err) => {
                error!(
                    job_id = %job.id,
                    kind = %job.kind,
                    attempts_made = job.attempts_made,
                    error = %err,
                    "Job failed permanently"
                );
                JobOutcome::TerminalFailure(JobReport::failed(job, MAX_RETRIES_EXCEEDED))
            }
        }
    }
}

impl Default for JobProcessor {
    fn default() -> Self {
        Self::new()
    }
}
