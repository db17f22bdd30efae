//! Domain types and HTTP DTOs
//!
//! `task` holds the task records shared by the store, the jobs and the API;
//! `requests`/`responses` define the HTTP bodies.

pub mod requests;
pub mod responses;
pub mod task;

pub use requests::{CreateTaskRequest, ListTasksQuery, UpdateTaskRequest};
pub use responses::{DeleteResponse, HealthResponse, Pagination, StatsResponse, TaskPage};
pub use task::{
    NewTask, SortDirection, SortField, SortOrder, Task, TaskFilter, TaskPatch, TaskPriority,
    TaskStatus,
};
