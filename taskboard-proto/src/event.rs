//! Push events delivered over the push channel.

use serde::{Deserialize, Serialize};

use crate::employee::EmployeeId;
use crate::task::{TaskId, TaskPatch, TaskRecord};

/// A server-to-client change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PushEvent {
    /// A task was created (or re-announced).
    TaskCreated(TaskRecord),
    /// A task changed; only the fields present in the patch are meaningful.
    TaskUpdated(TaskPatch),
    /// A task was deleted. The id is optional so malformed events survive decoding.
    TaskDeleted {
        /// Deleted task.
        task_id: Option<TaskId>,
    },
    /// An admin activated or deactivated an employee.
    EmployeeStatus {
        /// Employee whose flag changed.
        employee_id: EmployeeId,
        /// New value of the active flag.
        active: bool,
    },
    /// An employee came online or went offline.
    EmployeePresence {
        /// Employee whose presence changed.
        employee_id: EmployeeId,
        /// Whether the employee is connected.
        online: bool,
    },
}

impl PushEvent {
    /// The event's channel name.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::TaskCreated(_) => "task-created",
            Self::TaskUpdated(_) => "task-updated",
            Self::TaskDeleted { .. } => "task-deleted",
            Self::EmployeeStatus { .. } => "employee-status",
            Self::EmployeePresence { .. } => "employee-presence",
        }
    }

    /// The task this event concerns, if any.
    #[must_use]
    pub const fn task_id(&self) -> Option<TaskId> {
        match self {
            Self::TaskCreated(record) => record.task_id,
            Self::TaskUpdated(patch) => patch.task_id,
            Self::TaskDeleted { task_id } => *task_id,
            Self::EmployeeStatus { .. } | Self::EmployeePresence { .. } => None,
        }
    }
}
