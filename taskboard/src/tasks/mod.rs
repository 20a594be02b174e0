//! Client-side task state for the board.
//!
//! The [`store::TaskStore`] holds each employee's ordered active tasks and
//! an archive of completed ones. The
//! [`reconcile::Reconciler`] applies push events and local reorders to it,
//! and the [`queue::EventQueue`] holds events that arrive before the first
//! snapshot. [`filter::project`] derives the searchable view, while
//! [`ledger::MutationLedger`] and [`draft`] cover local edits.

pub mod draft;
pub mod filter;
pub mod ledger;
pub mod queue;
pub mod reconcile;
pub mod store;

pub use filter::{
    CompletedDay, CompletedGroup, GroupView, Projection, Roster, completed_by_date, project,
};
pub use ledger::{MutationId, MutationKind, MutationLedger};
pub use queue::{Dispatch, EventQueue};
pub use reconcile::{Outcome, Reconciler};
pub use store::{EmployeeGroup, TaskStore};

use chrono::NaiveDate;
use taskboard_proto::employee::EmployeeId;
use thiserror::Error;

/// Errors raised while applying events or reorders.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReconcileError {
    /// A task event arrived without a task id.
    #[error("{kind} event is missing its task_id")]
    MissingTaskId {
        /// Event channel name.
        kind: &'static str,
    },
    /// The employee has no group on the board.
    #[error("unknown employee: {0}")]
    UnknownEmployee(EmployeeId),
    /// A reorder index is past the end of the list.
    #[error("index {index} out of range for employee {employee_id} ({len} tasks)")]
    IndexOutOfRange {
        /// List owner.
        employee_id: EmployeeId,
        /// Offending index.
        index: usize,
        /// List length.
        len: usize,
    },
}

/// Errors raised by create/edit form validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DraftError {
    /// Task title cannot be empty.
    #[error("task title cannot be empty")]
    TitleEmpty,
    /// Task title exceeds the maximum length.
    #[error("task title too long (max 256 characters)")]
    TitleTooLong,
    /// No start date was given.
    #[error("start date is required")]
    MissingStartDate,
    /// No due date was given.
    #[error("due date is required")]
    MissingDueDate,
    /// New tasks cannot start in the past.
    #[error("start date {start} is before today ({today})")]
    StartInPast {
        /// Requested start.
        start: NaiveDate,
        /// Current day.
        today: NaiveDate,
    },
    /// Due date precedes start date.
    #[error("due date {due} is before start date {start}")]
    DueBeforeStart {
        /// Start date.
        start: NaiveDate,
        /// Due date.
        due: NaiveDate,
    },
    /// Completion date precedes start date.
    #[error("completion date {completion} is before start date {start}")]
    CompletionBeforeStart {
        /// Start date.
        start: NaiveDate,
        /// Completion date.
        completion: NaiveDate,
    },
    /// A task needs at least one assignee.
    #[error("select at least one employee")]
    NoAssignees,
}
