//! Request DTOs for the task API
//!
//! Defines the query strings and bodies accepted by the `/tasks` routes.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::{NewTask, TaskFilter, TaskPatch, TaskPriority, TaskStatus};

/// Page size used when the query does not name one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Largest page size a client may ask for.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Maximum title length accepted on create and update.
pub const MAX_TITLE_LEN: usize = 256;

// == List Query ==
/// Query string for `GET /tasks`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksQuery {
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl ListTasksQuery {
    /// 1-based page number.
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size, clamped to `1..=MAX_PAGE_SIZE`.
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn skip(&self) -> usize {
        (self.page() as usize - 1) * self.limit() as usize
    }

    pub fn filter(&self) -> TaskFilter {
        TaskFilter {
            status: self.status,
            priority: self.priority,
            user_id: self.user_id.clone().filter(|u| !u.is_empty()),
            ..TaskFilter::default()
        }
    }

    /// Cache key for this query under `prefix`.
    ///
    /// Equivalent queries (same filters, same effective page and limit)
    /// produce the same key regardless of parameter order or defaults.
    pub fn cache_key(&self, prefix: &str) -> String {
        let filter = self.filter();
        format!(
            "{prefix}list:status={}&priority={}&userId={}&page={}&limit={}",
            filter.status.map(|s| s.as_str()).unwrap_or(""),
            filter.priority.map(|p| p.as_str()).unwrap_or(""),
            filter.user_id.as_deref().unwrap_or(""),
            self.page(),
            self.limit(),
        )
    }
}

fn validate_title(title: &str) -> Option<String> {
    if title.trim().is_empty() {
        return Some("Title cannot be empty".to_string());
    }
    if title.len() > MAX_TITLE_LEN {
        return Some(format!(
            "Title exceeds maximum length of {MAX_TITLE_LEN} characters"
        ));
    }
    None
}

// == Create Request ==
/// Body of `POST /tasks`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    pub user_id: String,
}

impl CreateTaskRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.user_id.trim().is_empty() {
            return Some("userId cannot be empty".to_string());
        }
        validate_title(&self.title)
    }

    pub fn into_new_task(self) -> NewTask {
        NewTask {
            title: self.title,
            description: self.description,
            status: self.status.unwrap_or(TaskStatus::Pending),
            priority: self.priority.unwrap_or_default(),
            due_date: self.due_date,
            user_id: self.user_id,
        }
    }
}

// == Update Request ==
/// Body of `PATCH /tasks/:id`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

impl UpdateTaskRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if let Some(error) = self.title.as_deref().and_then(validate_title) {
            return Some(error);
        }
        if self.clone().into_patch().is_empty() {
            return Some("Request must change at least one field".to_string());
        }
        None
    }

    pub fn into_patch(self) -> TaskPatch {
        TaskPatch {
            title: self.title,
            description: self.description,
            status: self.status,
            priority: self.priority,
            due_date: self.due_date,
        }
    }
}
