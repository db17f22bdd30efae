//! Job queue interface and an in-memory implementation.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::error::QueueError;
use crate::jobs::Job;

/// Producer side of a job queue.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Adds a job and returns its id.
    async fn enqueue(&self, kind: &str, payload: Map<String, Value>) -> Result<String, QueueError>;
}

/// Enqueues a job without letting a queue failure reach the caller.
///
/// Returns the job id, or None after logging the failure.
pub async fn enqueue_best_effort(
    queue: &dyn JobQueue,
    kind: &str,
    payload: Map<String, Value>,
) -> Option<String> {
    match queue.enqueue(kind, payload).await {
        Ok(job_id) => Some(job_id),
        Err(err) => {
            warn!(kind, error = %err, "Failed to enqueue job");
            None
        }
    }
}

// == In-Memory Queue ==
/// Bounded queue over a tokio mpsc channel.
///
/// The receiving half returned by [`InMemoryJobQueue::new`] is handed to a
/// [`JobWorker`](crate::jobs::JobWorker).
#[derive(Debug, Clone)]
pub struct InMemoryJobQueue {
    tx: mpsc::Sender<Job>,
}

impl InMemoryJobQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Job>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Puts a job back on the queue, waiting for room if necessary.
    pub async fn redeliver(&self, job: Job) -> Result<(), QueueError> {
        self.tx.send(job).await.map_err(|_| QueueError::Closed)
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, kind: &str, payload: Map<String, Value>) -> Result<String, QueueError> {
        let job = Job::new(kind, payload);
        let job_id = job.id.clone();

        self.tx.try_send(job).map_err(|err| match err {
            TrySendError::Full(_) => QueueError::Full,
            TrySendError::Closed(_) => QueueError::Closed,
        })?;

        debug!(job_id = %job_id, kind, "Job enqueued");
        Ok(job_id)
    }
}
