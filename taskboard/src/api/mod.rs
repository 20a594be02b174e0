//! REST access to the task service.
//!
//! [`TaskApi`] is the seam the board view talks through; [`http::HttpTaskApi`]
//! is the production implementation.

pub mod http;

use std::future::Future;

use taskboard_proto::channel::Topic;
use taskboard_proto::employee::{EmployeeId, EmployeeRecord};
use taskboard_proto::task::{CreatedTask, TaskDraft, TaskId, TaskPatch, TaskRecord};

/// Errors returned by the task service client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(String),
    /// The task no longer exists on the service.
    #[error("task {0} not found")]
    NotFound(TaskId),
    /// The service rejected the change as conflicting with its state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Any other non-success status.
    #[error("service returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, if readable.
        body: String,
    },
    /// The response body did not match the expected shape.
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether the local view of this task is stale and must be refetched.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Conflict(_))
    }
}

/// Everything needed to (re)build the board.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Employees shown as columns.
    pub employees: Vec<EmployeeRecord>,
    /// Task rows, completed ones included.
    pub tasks: Vec<TaskRecord>,
}

/// Asynchronous task-service operations used by the board.
pub trait TaskApi: Send + Sync {
    /// Fetches the employees and task rows visible in `scope`.
    ///
    /// An owner scope returns that admin's employees and all their tasks; an
    /// employee scope returns just that employee and their own tasks.
    fn fetch_snapshot(
        &self,
        scope: Topic,
    ) -> impl Future<Output = Result<Snapshot, ApiError>> + Send;

    /// Creates a task and returns the stored record with one row per
    /// assignee.
    fn create_task(
        &self,
        draft: &TaskDraft,
    ) -> impl Future<Output = Result<CreatedTask, ApiError>> + Send;

    /// Applies a partial update and returns the stored record.
    fn update_task(
        &self,
        task_id: TaskId,
        patch: &TaskPatch,
    ) -> impl Future<Output = Result<TaskRecord, ApiError>> + Send;

    /// Deletes a task.
    fn delete_task(&self, task_id: TaskId) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Activates or deactivates an employee and returns the stored profile.
    fn set_employee_status(
        &self,
        employee_id: EmployeeId,
        active: bool,
    ) -> impl Future<Output = Result<EmployeeRecord, ApiError>> + Send;
}
