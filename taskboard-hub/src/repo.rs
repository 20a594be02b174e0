//! In-memory task repository.
//!
//! Holds employee profiles and tasks. A task carries one position per
//! assignee, so the same task can sit at a different rank in each
//! employee's list. Reads produce per-assignment [`TaskRecord`]s (with
//! `employee_id` set); mutations also return the full record.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use taskboard_proto::employee::{EmployeeDraft, EmployeeId, EmployeeRecord, OwnerId};
use taskboard_proto::task::{
    MAX_TASK_TITLE_LENGTH, Priority, TaskDraft, TaskId, TaskPatch, TaskRecord, TaskStatus,
};
use tokio::sync::RwLock;

/// Errors returned by repository operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepoError {
    /// No task with this id.
    #[error("task {0} not found")]
    TaskNotFound(TaskId),
    /// No employee with this id.
    #[error("employee {0} not found")]
    EmployeeNotFound(EmployeeId),
    /// The request is malformed or violates a task rule.
    #[error("{0}")]
    Invalid(String),
}

/// The result of a task mutation, used to answer the request and to fan
/// out push events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    /// Admin owning the task.
    pub owner_id: OwnerId,
    /// Full record after the mutation (before it, for a delete).
    pub record: TaskRecord,
    /// One row per current assignee.
    pub scoped: Vec<TaskRecord>,
    /// Employees who lost the task.
    pub removed: Vec<EmployeeId>,
}

impl Mutation {
    /// The row for `employee_id`, if it is still an assignee.
    #[must_use]
    pub fn scoped_for(&self, employee_id: EmployeeId) -> Option<&TaskRecord> {
        self.scoped
            .iter()
            .find(|r| r.employee_id == Some(employee_id))
    }
}

#[derive(Debug, Clone)]
struct StoredTask {
    id: TaskId,
    owner_id: OwnerId,
    title: String,
    description: String,
    start_date: NaiveDate,
    due_date: NaiveDate,
    completion_date: Option<NaiveDate>,
    priority: Option<Priority>,
    status: TaskStatus,
    positions: BTreeMap<EmployeeId, u32>,
}

#[derive(Debug, Default)]
struct Inner {
    employees: BTreeMap<EmployeeId, EmployeeRecord>,
    tasks: BTreeMap<TaskId, StoredTask>,
    next_employee: u64,
    next_task: u64,
}

impl Inner {
    fn record(&self, task: &StoredTask, scope: Option<EmployeeId>) -> TaskRecord {
        let employee_ids: Vec<EmployeeId> = task.positions.keys().copied().collect();
        let embedded = match scope {
            Some(id) => vec![id],
            None => employee_ids.clone(),
        };
        let position = scope
            .and_then(|id| task.positions.get(&id))
            .or_else(|| task.positions.values().next())
            .copied()
            .unwrap_or(0);
        TaskRecord {
            task_id: Some(task.id),
            title: task.title.clone(),
            description: task.description.clone(),
            start_date: task.start_date,
            due_date: task.due_date,
            completion_date: task.completion_date,
            priority: task.priority,
            status: task.status,
            position,
            employee_id: scope,
            employee_ids,
            employees: embedded
                .iter()
                .filter_map(|id| self.employees.get(id).cloned())
                .collect(),
        }
    }

    fn mutation(&self, task: &StoredTask, removed: Vec<EmployeeId>) -> Mutation {
        Mutation {
            owner_id: task.owner_id,
            record: self.record(task, None),
            scoped: task
                .positions
                .keys()
                .map(|id| self.record(task, Some(*id)))
                .collect(),
            removed,
        }
    }

    /// Rows of one employee's list, ordered by (position, id).
    fn rows_for(&self, employee_id: EmployeeId) -> Vec<TaskRecord> {
        let mut rows: Vec<(u32, TaskId, TaskRecord)> = self
            .tasks
            .values()
            .filter_map(|task| {
                let position = *task.positions.get(&employee_id)?;
                Some((position, task.id, self.record(task, Some(employee_id))))
            })
            .collect();
        rows.sort_by_key(|(position, id, _)| (*position, *id));
        rows.into_iter().map(|(_, _, row)| row).collect()
    }

    /// Position that puts a task after every active task of `employee_id`.
    fn end_of_list(&self, employee_id: EmployeeId, except: Option<TaskId>) -> u32 {
        self.tasks
            .values()
            .filter(|t| t.status.is_active() && Some(t.id) != except)
            .filter_map(|t| t.positions.get(&employee_id))
            .max()
            .map_or(0, |max| max.saturating_add(1))
    }

    fn check_assignees(&self, owner_id: OwnerId, ids: &[EmployeeId]) -> Result<(), RepoError> {
        if ids.is_empty() {
            return Err(RepoError::Invalid(
                "a task needs at least one assignee".to_string(),
            ));
        }
        for id in ids {
            let employee = self
                .employees
                .get(id)
                .ok_or(RepoError::EmployeeNotFound(*id))?;
            if employee.owner_id != owner_id {
                return Err(RepoError::Invalid(format!(
                    "employee {id} does not report to owner {owner_id}"
                )));
            }
        }
        Ok(())
    }
}

fn check_title(title: &str) -> Result<(), RepoError> {
    if title.trim().is_empty() {
        return Err(RepoError::Invalid("title must not be empty".to_string()));
    }
    if title.chars().count() > MAX_TASK_TITLE_LENGTH {
        return Err(RepoError::Invalid(format!(
            "title exceeds {MAX_TASK_TITLE_LENGTH} characters"
        )));
    }
    Ok(())
}

/// An employee may finish a task before its planned start, so only the
/// due date is checked against the start date here.
fn check_dates(task: &StoredTask) -> Result<(), RepoError> {
    if task.due_date < task.start_date {
        return Err(RepoError::Invalid(
            "due date is before start date".to_string(),
        ));
    }
    Ok(())
}

/// Thread-safe in-memory store of employees and tasks.
#[derive(Debug, Default)]
pub struct TaskRepository {
    inner: RwLock<Inner>,
}

impl TaskRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an employee under an admin and assigns an id.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Invalid`] if the first name is blank.
    pub async fn add_employee(&self, draft: EmployeeDraft) -> Result<EmployeeRecord, RepoError> {
        if draft.first_name.trim().is_empty() {
            return Err(RepoError::Invalid(
                "first name must not be empty".to_string(),
            ));
        }
        let mut inner = self.inner.write().await;
        inner.next_employee += 1;
        let record = EmployeeRecord {
            id: EmployeeId::new(inner.next_employee),
            first_name: draft.first_name,
            last_name: draft.last_name,
            gender: draft.gender,
            owner_id: draft.owner_id,
            active: true,
        };
        inner.employees.insert(record.id, record.clone());
        Ok(record)
    }

    /// Sets an employee's active flag.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::EmployeeNotFound`] for an unknown employee.
    pub async fn set_employee_active(
        &self,
        id: EmployeeId,
        active: bool,
    ) -> Result<EmployeeRecord, RepoError> {
        let mut inner = self.inner.write().await;
        let employee = inner
            .employees
            .get_mut(&id)
            .ok_or(RepoError::EmployeeNotFound(id))?;
        employee.active = active;
        Ok(employee.clone())
    }

    /// Looks up one employee.
    pub async fn employee(&self, id: EmployeeId) -> Option<EmployeeRecord> {
        self.inner.read().await.employees.get(&id).cloned()
    }

    /// Employees reporting to `owner_id`, by id.
    pub async fn employees_of(&self, owner_id: OwnerId) -> Vec<EmployeeRecord> {
        self.inner
            .read()
            .await
            .employees
            .values()
            .filter(|e| e.owner_id == owner_id)
            .cloned()
            .collect()
    }

    /// Per-assignment rows for every employee of `owner_id`, grouped by
    /// employee and ordered by position within each group.
    pub async fn tasks_for_owner(&self, owner_id: OwnerId) -> Vec<TaskRecord> {
        let inner = self.inner.read().await;
        inner
            .employees
            .values()
            .filter(|e| e.owner_id == owner_id)
            .flat_map(|e| inner.rows_for(e.id))
            .collect()
    }

    /// Per-assignment rows of one employee's list.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::EmployeeNotFound`] for an unknown employee.
    pub async fn tasks_for_employee(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Vec<TaskRecord>, RepoError> {
        let inner = self.inner.read().await;
        if !inner.employees.contains_key(&employee_id) {
            return Err(RepoError::EmployeeNotFound(employee_id));
        }
        Ok(inner.rows_for(employee_id))
    }

    /// Creates a task. Without a draft position the task goes to the end
    /// of each assignee's list.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Invalid`] for a bad title, missing or
    /// inconsistent dates, or no assignees, and
    /// [`RepoError::EmployeeNotFound`] for an unknown assignee.
    pub async fn create(&self, draft: TaskDraft, today: NaiveDate) -> Result<Mutation, RepoError> {
        check_title(&draft.title)?;
        let start_date = draft
            .start_date
            .ok_or_else(|| RepoError::Invalid("start date is required".to_string()))?;
        let due_date = draft
            .due_date
            .ok_or_else(|| RepoError::Invalid("due date is required".to_string()))?;

        let mut inner = self.inner.write().await;
        inner.check_assignees(draft.owner_id, &draft.employee_ids)?;

        let status = draft.status.unwrap_or_default();
        let positions = draft
            .employee_ids
            .iter()
            .map(|id| (*id, draft.position.unwrap_or_else(|| inner.end_of_list(*id, None))))
            .collect();
        let task = StoredTask {
            id: TaskId::new(inner.next_task + 1),
            owner_id: draft.owner_id,
            title: draft.title,
            description: draft.description,
            start_date,
            due_date,
            completion_date: (!status.is_active()).then_some(today),
            priority: draft.priority,
            status,
            positions,
        };
        check_dates(&task)?;
        inner.next_task += 1;

        let mutation = inner.mutation(&task, Vec::new());
        inner.tasks.insert(task.id, task);
        Ok(mutation)
    }

    /// Applies a partial update.
    ///
    /// A `position` scoped by `employee_id` moves the task in that list
    /// only; an unscoped one applies to every list. A new `employee_ids`
    /// set replaces the assignees: kept assignees keep their rank, new ones
    /// go to the end of their list. Completing a task without a completion
    /// date stamps `today`; any other status clears it.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::TaskNotFound`] for an unknown task, and
    /// [`RepoError::Invalid`] or [`RepoError::EmployeeNotFound`] if the
    /// result would break a task rule. Nothing changes on error.
    pub async fn update(
        &self,
        task_id: TaskId,
        patch: &TaskPatch,
        today: NaiveDate,
    ) -> Result<Mutation, RepoError> {
        let mut inner = self.inner.write().await;
        let mut task = inner
            .tasks
            .get(&task_id)
            .cloned()
            .ok_or(RepoError::TaskNotFound(task_id))?;

        if let Some(title) = &patch.title {
            check_title(title)?;
            task.title.clone_from(title);
        }
        if let Some(description) = &patch.description {
            task.description.clone_from(description);
        }
        if let Some(start) = patch.start_date {
            task.start_date = start;
        }
        if let Some(due) = patch.due_date {
            task.due_date = due;
        }
        if patch.priority.is_some() {
            task.priority = patch.priority;
        }
        match patch.status {
            Some(TaskStatus::Completed) => {
                task.status = TaskStatus::Completed;
                task.completion_date = patch
                    .completion_date
                    .or(task.completion_date)
                    .or(Some(today));
            }
            Some(status) => {
                task.status = status;
                task.completion_date = None;
            }
            None => {
                if patch.completion_date.is_some() {
                    task.completion_date = patch.completion_date;
                }
            }
        }
        check_dates(&task)?;

        let mut removed = Vec::new();
        if let Some(ids) = &patch.employee_ids {
            inner.check_assignees(task.owner_id, ids)?;
            removed = task
                .positions
                .keys()
                .filter(|id| !ids.contains(id))
                .copied()
                .collect();
            let positions = ids
                .iter()
                .map(|id| {
                    let kept = task.positions.get(id).copied();
                    (
                        *id,
                        kept.unwrap_or_else(|| inner.end_of_list(*id, Some(task_id))),
                    )
                })
                .collect();
            task.positions = positions;
        }

        if let Some(position) = patch.position {
            match patch.employee_id {
                Some(employee_id) => {
                    let slot = task.positions.get_mut(&employee_id).ok_or_else(|| {
                        RepoError::Invalid(format!(
                            "task {task_id} is not assigned to employee {employee_id}"
                        ))
                    })?;
                    *slot = position;
                }
                None => task.positions.values_mut().for_each(|p| *p = position),
            }
        }

        let mutation = inner.mutation(&task, removed);
        inner.tasks.insert(task_id, task);
        Ok(mutation)
    }

    /// Deletes a task.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::TaskNotFound`] if there is no such task.
    pub async fn delete(&self, task_id: TaskId) -> Result<Mutation, RepoError> {
        let mut inner = self.inner.write().await;
        let task = inner
            .tasks
            .remove(&task_id)
            .ok_or(RepoError::TaskNotFound(task_id))?;
        let removed = task.positions.keys().copied().collect();
        let mut mutation = inner.mutation(&task, removed);
        mutation.scoped.clear();
        Ok(mutation)
    }

    /// Number of stored tasks.
    pub async fn task_count(&self) -> usize {
        self.inner.read().await.tasks.len()
    }
}
