//! Task Store Module
//!
//! The task store is an external collaborator; this module defines the
//! interface the core consumes and an in-memory implementation used by the
//! server binary and the tests.

mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{NewTask, SortOrder, Task, TaskFilter, TaskPatch};

pub use memory::InMemoryTaskStore;

/// Persistence interface for tasks.
///
/// Every method may suspend. Counts returned by the write methods are the
/// number of records affected (0 when the id is unknown).
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Counts tasks matching `filter`, or all tasks when `None`.
    async fn count(&self, filter: Option<&TaskFilter>) -> Result<u64, StoreError>;

    /// Returns one page of matching tasks plus the total number of matches.
    async fn find_page(
        &self,
        filter: &TaskFilter,
        skip: usize,
        take: usize,
        order: SortOrder,
    ) -> Result<(Vec<Task>, u64), StoreError>;

    /// Stores a new task, assigning its id and timestamps.
    async fn create(&self, new: NewTask) -> Result<Task, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Task>, StoreError>;

    async fn update_by_id(&self, id: &str, patch: &TaskPatch) -> Result<u64, StoreError>;

    async fn delete_by_id(&self, id: &str) -> Result<u64, StoreError>;
}
