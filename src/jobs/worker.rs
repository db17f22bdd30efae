//! Delivery loop between the in-memory queue and the processor.
//!
//! The worker is where a [`JobOutcome`] turns into queue behavior: retriable
//! failures go back on the queue with `attempts_made` bumped, everything else
//! is finished.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::jobs::{InMemoryJobQueue, Job, JobOutcome, JobProcessor};

/// Longest backoff exponent.
const MAX_BACKOFF_SHIFT: u32 = 10;

/// Delay before redelivering a job that has failed `attempts_made` times.
///
/// Doubles per attempt up to `2^MAX_BACKOFF_SHIFT` and saturates at
/// [`Duration::MAX`].
fn backoff_delay(retry_delay: Duration, attempts_made: u32) -> Duration {
    retry_delay
        .checked_mul(1u32 << attempts_made.min(MAX_BACKOFF_SHIFT))
        .unwrap_or(Duration::MAX)
}

/// One delivery and what came of it.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryReport {
    pub job: Job,
    pub outcome: JobOutcome,
}

// == Job Worker ==
pub struct JobWorker {
    processor: Arc<JobProcessor>,
    concurrency: usize,
    retry_delay: Duration,
    reports: Option<mpsc::UnboundedSender<DeliveryReport>>,
}

impl JobWorker {
    /// Creates a worker running at most `concurrency` jobs at once.
    pub fn new(processor: Arc<JobProcessor>, concurrency: usize) -> Self {
        Self {
            processor,
            concurrency: concurrency.max(1),
            retry_delay: Duration::from_secs(1),
            reports: None,
        }
    }

    /// Base delay before redelivery; doubles with each attempt.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Sends a [`DeliveryReport`] for every delivery to `reports`.
    pub fn with_reports(mut self, reports: mpsc::UnboundedSender<DeliveryReport>) -> Self {
        self.reports = Some(reports);
        self
    }

    /// Starts consuming `jobs`. Redeliveries go through `queue`.
    ///
    /// The returned handle runs until aborted.
    pub fn spawn(self, queue: InMemoryJobQueue, mut jobs: mpsc::Receiver<Job>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(concurrency = self.concurrency, "Starting job worker");
            let permits = Arc::new(Semaphore::new(self.concurrency));

            while let Some(job) = jobs.recv().await {
                let Ok(permit) = permits.clone().acquire_owned().await else {
                    break;
                };
                let processor = self.processor.clone();
                let queue = queue.clone();
                let reports = self.reports.clone();
                let retry_delay = self.retry_delay;

                tokio::spawn(async move {
                    let outcome = processor.handle(&job).await;
                    drop(permit);

                    if let Some(reports) = &reports {
                        let _ = reports.send(DeliveryReport {
                            job: job.clone(),
                            outcome: outcome.clone(),
                        });
                    }

                    if let JobOutcome::RetriableFailure { .. } = outcome {
                        let backoff = backoff_delay(retry_delay, job.attempts_made);
                        let mut next = job;
                        next.attempts_made += 1;
                        debug!(
                            job_id = %next.id,
                            attempts_made = next.attempts_made,
                            backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                            "Scheduling redelivery"
                        );

                        tokio::time::sleep(backoff).await;
                        if let Err(err) = queue.redeliver(next).await {
                            warn!(error = %err, "Could not redeliver job");
                        }
                    }
                });
            }

            info!("Job worker stopped");
        })
    }
}
