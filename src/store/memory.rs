//! In-memory task store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::TaskStore;
use crate::error::StoreError;
use crate::models::{NewTask, SortOrder, Task, TaskFilter, TaskPatch};

/// Task store backed by a `HashMap` behind a tokio `RwLock`.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<String, Task>>,
    /// When set, every operation fails with `StoreError::Unavailable`.
    offline: AtomicBool,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a task, assigning a fresh id and timestamps.
    pub async fn insert(&self, new: NewTask) -> Result<Task, StoreError> {
        self.ensure_online()?;
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4().to_string(),
            title: new.title,
            description: new.description,
            status: new.status,
            priority: new.priority,
            due_date: new.due_date,
            user_id: new.user_id,
            created_at: now,
            updated_at: now,
        };
        self.tasks.write().await.insert(task.id.clone(), task.clone());
        Ok(task)
    }

    /// Simulates losing (or regaining) the connection to the store.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("task store is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn count(&self, filter: Option<&TaskFilter>) -> Result<u64, StoreError> {
        self.ensure_online()?;
        let tasks = self.tasks.read().await;
        let count = match filter {
            Some(filter) => tasks.values().filter(|t| filter.matches(t)).count(),
            None => tasks.len(),
        };
        Ok(count as u64)
    }

    async fn find_page(
        &self,
        filter: &TaskFilter,
        skip: usize,
        take: usize,
        order: SortOrder,
    ) -> Result<(Vec<Task>, u64), StoreError> {
        self.ensure_online()?;
        let tasks = self.tasks.read().await;

        let mut matching: Vec<&Task> = tasks.values().filter(|t| filter.matches(t)).collect();
        let total = matching.len() as u64;
        matching.sort_by(|a, b| order.compare(a, b));

        let page = matching.into_iter().skip(skip).take(take).cloned().collect();
        Ok((page, total))
    }

    async fn create(&self, new: NewTask) -> Result<Task, StoreError> {
        self.insert(new).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Task>, StoreError> {
        self.ensure_online()?;
        Ok(self.tasks.read().await.get(id).cloned())
    }

    async fn update_by_id(&self, id: &str, patch: &TaskPatch) -> Result<u64, StoreError> {
        self.ensure_online()?;
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(id) {
            Some(task) => {
                patch.apply_to(task);
                task.updated_at = Utc::now();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_by_id(&self, id: &str) -> Result<u64, StoreError> {
        self.ensure_online()?;
        Ok(self.tasks.write().await.remove(id).map_or(0, |_| 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SortDirection, SortField, TaskStatus};
    use chrono::Duration;

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = InMemoryTaskStore::new();
        let task = store.insert(NewTask::new("write docs", "user-1")).await.unwrap();

        let found = store.find_by_id(&task.id).await.unwrap();
        assert_eq!(found, Some(task));
        assert_eq!(store.count(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete_report_affected_rows() {
        let store = InMemoryTaskStore::new();
        let task = store.insert(NewTask::new("a", "u")).await.unwrap();

        let patch = TaskPatch::status(TaskStatus::Completed);
        assert_eq!(store.update_by_id(&task.id, &patch).await.unwrap(), 1);
        assert_eq!(store.update_by_id("missing", &patch).await.unwrap(), 0);

        let updated = store.find_by_id(&task.id).await.unwrap().unwrap();
        assert_eq!(updated.status, TaskStatus::Completed);
        assert!(updated.updated_at >= task.updated_at);

        assert_eq!(store.delete_by_id(&task.id).await.unwrap(), 1);
        assert_eq!(store.delete_by_id(&task.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_page_filters_sorts_and_counts() {
        let store = InMemoryTaskStore::new();
        let now = Utc::now();
        for hours in [3, 1, 2] {
            store
                .insert(NewTask::new(format!("due in {hours}"), "u").due(now + Duration::hours(hours)))
                .await
                .unwrap();
        }
        store
            .insert(NewTask::new("done", "u").with_status(TaskStatus::Completed))
            .await
            .unwrap();

        let filter = TaskFilter {
            status: Some(TaskStatus::Pending),
            ..Default::default()
        };
        let order = SortOrder::new(SortField::DueDate, SortDirection::Asc);
        let (page, total) = store.find_page(&filter, 1, 5, order).await.unwrap();

        assert_eq!(total, 3);
        let titles: Vec<_> = page.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["due in 2", "due in 3"]);
        assert_eq!(store.count(Some(&filter)).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_offline_store_fails() {
        let store = InMemoryTaskStore::new();
        store.set_offline(true);

        let err = store.count(None).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        store.set_offline(false);
        assert_eq!(store.count(None).await.unwrap(), 0);
    }
}
