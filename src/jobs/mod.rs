//! Background job processing.
//!
//! Jobs are enqueued through [`JobQueue`], delivered by a [`JobWorker`] and
//! dispatched by a [`JobProcessor`] to the handler registered for their kind.

mod handlers;
mod job;
mod processor;
mod queue;
mod worker;

pub use handlers::{OverdueNotificationHandler, StatusUpdateHandler};
pub use job::{Job, JobOutcome, JobReport, MAX_ATTEMPTS, OVERDUE_TASKS_NOTIFICATION, TASK_STATUS_UPDATE};
pub use processor::{JobHandler, JobProcessor, TaskUpdate, MAX_RETRIES_EXCEEDED, UNKNOWN_KIND};
pub use queue::{enqueue_best_effort, InMemoryJobQueue, JobQueue};
pub use worker::{DeliveryReport, JobWorker};
