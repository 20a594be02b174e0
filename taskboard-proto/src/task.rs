//! Task model for the Taskboard wire format.
//!
//! Three shapes travel over the network:
//!
//! - [`TaskRecord`]: a full task as the REST service and push channel emit it.
//!   The identifier is optional on the wire so that a malformed record can be
//!   represented and rejected by the receiver instead of failing to decode.
//! - [`TaskPatch`]: a partial update where every field is optional.
//! - [`TaskDraft`]: the body of a create request (no identifier yet).
//!
//! [`Task`] is the validated in-memory form with a guaranteed identifier.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::employee::{EmployeeId, EmployeeRecord, OwnerId};

/// Maximum allowed task title length in characters.
pub const MAX_TASK_TITLE_LENGTH: usize = 256;

/// Server-assigned task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    /// Wraps a raw server identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task priority. An unset priority is represented as `None` at use sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    /// Low priority.
    Low,
    /// Medium priority.
    Medium,
    /// High priority.
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

/// Workflow status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Not started.
    #[default]
    Todo,
    /// Being worked on.
    #[serde(rename = "In Progress")]
    InProgress,
    /// Done. Completed tasks leave the active lists.
    Completed,
}

impl TaskStatus {
    /// Whether a task in this status belongs in the active (assigned) lists.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Todo => write!(f, "Todo"),
            Self::InProgress => write!(f, "In Progress"),
            Self::Completed => write!(f, "Completed"),
        }
    }
}

/// A task exactly as received from the REST service or push channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Server-assigned identifier; `None` marks a malformed record.
    #[serde(default)]
    pub task_id: Option<TaskId>,
    /// Short title shown on the card.
    pub title: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// First day of work.
    pub start_date: NaiveDate,
    /// Deadline.
    pub due_date: NaiveDate,
    /// Day the task was completed, if it was.
    #[serde(default)]
    pub completion_date: Option<NaiveDate>,
    /// Priority, or `None` when unset.
    #[serde(default)]
    pub priority: Option<Priority>,
    /// Workflow status.
    #[serde(default)]
    pub status: TaskStatus,
    /// Display rank within the list named by `employee_id` (or every
    /// assignee's list when `employee_id` is absent).
    #[serde(default)]
    pub position: u32,
    /// The single list this row belongs to, for per-assignment snapshot rows.
    #[serde(default)]
    pub employee_id: Option<EmployeeId>,
    /// Every employee the task is assigned to.
    #[serde(default)]
    pub employee_ids: Vec<EmployeeId>,
    /// Embedded employee payloads for assignees the receiver may not know.
    #[serde(default)]
    pub employees: Vec<EmployeeRecord>,
}

impl TaskRecord {
    /// Employees whose lists this record targets.
    ///
    /// A per-assignment row targets only its `employee_id`; otherwise every
    /// entry of `employee_ids` is targeted.
    #[must_use]
    pub fn target_employees(&self) -> Vec<EmployeeId> {
        self.employee_id
            .map_or_else(|| self.employee_ids.clone(), |id| vec![id])
    }
}

/// Error produced when a wire record cannot become a [`Task`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// The record carries no task identifier.
    #[error("task record is missing its task_id")]
    MissingId,
}

/// A validated task with a guaranteed identifier.
///
/// `position` is the rank within the list that holds this copy; each
/// assignee's list holds its own copy with an independent position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Server-assigned identifier.
    pub id: TaskId,
    /// Short title.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// First day of work.
    pub start_date: NaiveDate,
    /// Deadline.
    pub due_date: NaiveDate,
    /// Day of completion.
    pub completion_date: Option<NaiveDate>,
    /// Priority, `None` when unset.
    pub priority: Option<Priority>,
    /// Workflow status.
    pub status: TaskStatus,
    /// Display rank within the holding list.
    pub position: u32,
    /// Every employee the task is assigned to.
    pub assignees: Vec<EmployeeId>,
}

impl TryFrom<&TaskRecord> for Task {
    type Error = RecordError;

    fn try_from(record: &TaskRecord) -> Result<Self, Self::Error> {
        let id = record.task_id.ok_or(RecordError::MissingId)?;
        Ok(Self {
            id,
            title: record.title.clone(),
            description: record.description.clone(),
            start_date: record.start_date,
            due_date: record.due_date,
            completion_date: record.completion_date,
            priority: record.priority,
            status: record.status,
            position: record.position,
            assignees: record.employee_ids.clone(),
        })
    }
}

impl Task {
    /// Converts this task back into a wire record.
    #[must_use]
    pub fn to_record(&self) -> TaskRecord {
        TaskRecord {
            task_id: Some(self.id),
            title: self.title.clone(),
            description: self.description.clone(),
            start_date: self.start_date,
            due_date: self.due_date,
            completion_date: self.completion_date,
            priority: self.priority,
            status: self.status,
            position: self.position,
            employee_id: None,
            employee_ids: self.assignees.clone(),
            employees: Vec::new(),
        }
    }

    /// Shallow-merges a patch over this task; fields present in the patch win.
    ///
    /// The identifier is never changed. Moving to a non-completed status
    /// clears the completion date.
    pub fn apply_patch(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title.clone_from(title);
        }
        if let Some(description) = &patch.description {
            self.description.clone_from(description);
        }
        if let Some(start) = patch.start_date {
            self.start_date = start;
        }
        if let Some(due) = patch.due_date {
            self.due_date = due;
        }
        if let Some(priority) = patch.priority {
            self.priority = Some(priority);
        }
        if let Some(status) = patch.status {
            self.status = status;
            if status.is_active() {
                self.completion_date = None;
            }
        }
        if patch.completion_date.is_some() {
            self.completion_date = patch.completion_date;
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(ids) = &patch.employee_ids {
            self.assignees.clone_from(ids);
        }
    }
}

/// A partial task update. Absent fields leave the receiver's copy untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    /// Target task; `None` marks a malformed update.
    #[serde(default)]
    pub task_id: Option<TaskId>,
    /// New title.
    #[serde(default)]
    pub title: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New start date.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// New due date.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// New completion date.
    #[serde(default)]
    pub completion_date: Option<NaiveDate>,
    /// New priority.
    #[serde(default)]
    pub priority: Option<Priority>,
    /// New status.
    #[serde(default)]
    pub status: Option<TaskStatus>,
    /// New position, scoped to `employee_id` when present.
    #[serde(default)]
    pub position: Option<u32>,
    /// Single employee whose list this update concerns.
    #[serde(default)]
    pub employee_id: Option<EmployeeId>,
    /// Full replacement assignee set.
    #[serde(default)]
    pub employee_ids: Option<Vec<EmployeeId>>,
    /// Embedded employee payloads.
    #[serde(default)]
    pub employees: Vec<EmployeeRecord>,
}

impl TaskPatch {
    /// A patch that only moves a task within one employee's list.
    #[must_use]
    pub fn position(task_id: TaskId, employee_id: EmployeeId, position: u32) -> Self {
        Self {
            task_id: Some(task_id),
            position: Some(position),
            employee_id: Some(employee_id),
            ..Self::default()
        }
    }

    /// Employees explicitly named by this patch, if any.
    #[must_use]
    pub fn named_employees(&self) -> Option<Vec<EmployeeId>> {
        match (&self.employee_ids, self.employee_id) {
            (Some(ids), _) => Some(ids.clone()),
            (None, Some(id)) => Some(vec![id]),
            (None, None) => None,
        }
    }

    /// Builds a patch carrying every field of a full record.
    #[must_use]
    pub fn from_record(record: &TaskRecord) -> Self {
        Self {
            task_id: record.task_id,
            title: Some(record.title.clone()),
            description: Some(record.description.clone()),
            start_date: Some(record.start_date),
            due_date: Some(record.due_date),
            completion_date: record.completion_date,
            priority: record.priority,
            status: Some(record.status),
            position: record.employee_id.map(|_| record.position),
            employee_id: record.employee_id,
            employee_ids: Some(record.employee_ids.clone()),
            employees: record.employees.clone(),
        }
    }
}

/// Answer to a create request.
///
/// `rows` holds one per-assignment row per assignee, each carrying that
/// assignee's own position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedTask {
    /// The stored task.
    pub record: TaskRecord,
    /// Per-assignment rows.
    #[serde(default)]
    pub rows: Vec<TaskRecord>,
}

/// Body of a create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    /// Short title.
    pub title: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// First day of work.
    pub start_date: Option<NaiveDate>,
    /// Deadline.
    pub due_date: Option<NaiveDate>,
    /// Priority.
    #[serde(default)]
    pub priority: Option<Priority>,
    /// Initial status; the service defaults it to [`TaskStatus::Todo`].
    #[serde(default)]
    pub status: Option<TaskStatus>,
    /// Initial rank; `None` appends to the end of each list.
    #[serde(default)]
    pub position: Option<u32>,
    /// Admin creating the task.
    pub owner_id: OwnerId,
    /// Employees the task is assigned to.
    pub employee_ids: Vec<EmployeeId>,
}
