//! Job records and the outcomes reported for each delivery.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::models::TaskStatus;

/// Job kind that writes a new status onto a task.
pub const TASK_STATUS_UPDATE: &str = "task-status-update";

/// Job kind raised for a task past its due date.
pub const OVERDUE_TASKS_NOTIFICATION: &str = "overdue-tasks-notification";

/// Deliveries with `attempts_made` below this are retried on failure.
pub const MAX_ATTEMPTS: u32 = 3;

// == Job ==
/// A unit of background work as delivered by the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub kind: String,
    #[serde(default)]
    pub payload: Map<String, Value>,
    /// Number of earlier deliveries of this job
    #[serde(default)]
    pub attempts_made: u32,
}

impl Job {
    /// Creates a first-delivery job with a fresh id.
    pub fn new(kind: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: kind.into(),
            payload,
            attempts_made: 0,
        }
    }

    /// The `taskId` payload field, when present as a string.
    pub fn task_id(&self) -> Option<&str> {
        self.payload.get("taskId").and_then(Value::as_str)
    }
}

// == Job Report ==
/// Structured result of a terminal delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub success: bool,
    pub job_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobReport {
    pub fn succeeded(job: &Job, task_id: impl Into<String>, new_status: TaskStatus) -> Self {
        Self {
            success: true,
            job_id: job.id.clone(),
            task_id: Some(task_id.into()),
            new_status: Some(new_status),
            error: None,
        }
    }

    pub fn failed(job: &Job, error: impl Into<String>) -> Self {
        Self {
            success: false,
            job_id: job.id.clone(),
            task_id: job.task_id().map(str::to_string),
            new_status: None,
            error: Some(error.into()),
        }
    }
}

// == Job Outcome ==
/// What the queue should do with a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Done; do not redeliver.
    Success(JobReport),
    /// Failed below the retry ceiling; redeliver.
    RetriableFailure { error: String },
    /// Failed for good; do not redeliver.
    TerminalFailure(JobReport),
}

impl JobOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobOutcome::RetriableFailure { .. })
    }

    /// The report of a terminal outcome.
    pub fn report(&self) -> Option<&JobReport> {
        match self {
            JobOutcome::Success(report) | JobOutcome::TerminalFailure(report) => Some(report),
            JobOutcome::RetriableFailure { .. } => None,
        }
    }
}
