//! Applies push events and local reorders to the [`TaskStore`].
//!
//! Every operation either applies completely or leaves the store untouched:
//! all checks happen before the first mutation. Applying the same event twice
//! yields the same store as applying it once. A task that becomes completed
//! moves from the lists into the store's archive; reopening moves it back.

use taskboard_proto::employee::{EmployeeId, EmployeeRecord};
use taskboard_proto::event::PushEvent;
use taskboard_proto::task::{Task, TaskId, TaskPatch, TaskRecord};
use tracing::{debug, trace};

use super::ReconcileError;
use super::store::TaskStore;

/// What an operation did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The store changed.
    Applied,
    /// Nothing to do; the store is unchanged.
    Unchanged,
}

impl Outcome {
    fn from_changed(changed: bool) -> Self {
        if changed { Self::Applied } else { Self::Unchanged }
    }
}

/// Owns the [`TaskStore`] and applies changes to it.
#[derive(Debug, Default)]
pub struct Reconciler {
    store: TaskStore,
}

impl Reconciler {
    /// Creates a reconciler over an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access to the reconciled state.
    #[must_use]
    pub const fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Replaces the state with a server snapshot. Returns skipped row count.
    pub fn load_snapshot(&mut self, employees: &[EmployeeRecord], rows: &[TaskRecord]) -> usize {
        let skipped = self.store.load_snapshot(employees, rows);
        if skipped > 0 {
            debug!(skipped, "snapshot rows skipped");
        }
        skipped
    }

    /// Applies one push event.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::MissingTaskId`] when a task event carries no
    /// identifier. The store is not modified in that case.
    pub fn apply(&mut self, event: &PushEvent) -> Result<Outcome, ReconcileError> {
        trace!(kind = event.kind(), task_id = ?event.task_id(), "applying event");
        match event {
            PushEvent::TaskCreated(record) => self.apply_created(record),
            PushEvent::TaskUpdated(patch) => self.apply_updated(patch),
            PushEvent::TaskDeleted { task_id } => {
                let task_id = task_id.ok_or(ReconcileError::MissingTaskId {
                    kind: event.kind(),
                })?;
                Ok(self.remove(task_id))
            }
            PushEvent::EmployeeStatus {
                employee_id,
                active,
            } => Ok(Outcome::from_changed(
                self.store.set_active(*employee_id, *active),
            )),
            PushEvent::EmployeePresence {
                employee_id,
                online,
            } => Ok(Outcome::from_changed(
                self.store.set_online(*employee_id, *online),
            )),
        }
    }

    fn apply_created(&mut self, record: &TaskRecord) -> Result<Outcome, ReconcileError> {
        let task = Task::try_from(record).map_err(|_| ReconcileError::MissingTaskId {
            kind: "task-created",
        })?;

        // A per-assignment row replaces only its own list; a full record
        // replaces the task everywhere.
        let mut changed = match record.employee_id {
            Some(employee_id) => self.store.remove_from(employee_id, task.id),
            None => self.store.remove(task.id) > 0,
        };
        if !task.status.is_active() {
            let mut known = false;
            for employee_id in record.target_employees() {
                known |= self.resolve_employee(employee_id, &record.employees);
            }
            if known {
                changed |= self.store.archive(task);
            }
            return Ok(Outcome::from_changed(changed));
        }
        changed |= self.store.unarchive(task.id).is_some();

        for employee_id in record.target_employees() {
            if !self.resolve_employee(employee_id, &record.employees) {
                continue;
            }
            changed |= self.store.upsert(employee_id, task.clone());
        }
        Ok(Outcome::from_changed(changed))
    }

    fn apply_updated(&mut self, patch: &TaskPatch) -> Result<Outcome, ReconcileError> {
        let task_id = patch.task_id.ok_or(ReconcileError::MissingTaskId {
            kind: "task-updated",
        })?;
        let archived = self.store.archived(task_id).cloned();
        let mut holders = self.store.holders(task_id);

        let mut fields = patch.clone();
        fields.position = None;

        // An edit that leaves the status alone keeps an archived task archived.
        if holders.is_empty()
            && patch.status.is_none()
            && let Some(mut task) = archived.clone()
        {
            task.apply_patch(&fields);
            return Ok(Outcome::from_changed(self.store.archive(task)));
        }
        if holders.is_empty()
            && let Some(task) = &archived
        {
            holders.clone_from(&task.assignees);
        }

        let (relevant, assigned): (Vec<EmployeeId>, Vec<EmployeeId>) = match patch
            .named_employees()
        {
            Some(named) if patch.employee_ids.is_some() => {
                let mut relevant = named.clone();
                for holder in &holders {
                    if !relevant.contains(holder) {
                        relevant.push(*holder);
                    }
                }
                (relevant, named)
            }
            Some(named) => (named.clone(), named),
            None => (holders.clone(), holders.clone()),
        };

        let completed = patch.status.is_some_and(|s| !s.is_active());
        let mut changed = false;
        let fallback = self
            .store
            .find(task_id)
            .cloned()
            .or_else(|| archived.clone());

        if completed {
            let base = fallback.or_else(|| task_from_patch(task_id, patch));
            for employee_id in &relevant {
                changed |= self.store.remove_from(*employee_id, task_id);
            }
            if let Some(mut task) = base {
                task.apply_patch(&fields);
                if changed || task.assignees.iter().any(|e| self.store.contains_group(*e)) {
                    changed |= self.store.archive(task);
                }
            }
            return Ok(Outcome::from_changed(changed));
        }
        if archived.is_some() {
            debug!(%task_id, "archived task reopened");
            changed |= self.store.unarchive(task_id).is_some();
        }

        let mut writes: Vec<(EmployeeId, Task)> = Vec::new();
        for employee_id in &assigned {
            let own = self.store.find_in(*employee_id, task_id).cloned();
            let had_copy = own.is_some();
            let Some(mut merged) = own
                .or_else(|| fallback.clone())
                .or_else(|| task_from_patch(task_id, patch))
            else {
                debug!(%task_id, %employee_id, "partial update for unknown task skipped");
                continue;
            };
            merged.apply_patch(&fields);

            let scoped_here = patch.employee_id.is_none_or(|e| e == *employee_id);
            match patch.position {
                Some(position) if scoped_here => merged.position = position,
                _ if !had_copy => {
                    merged.position = u32::try_from(self.store.read(*employee_id).len())
                        .unwrap_or(u32::MAX);
                }
                _ => {}
            }
            writes.push((*employee_id, merged));
        }

        for employee_id in relevant.iter().filter(|e| !assigned.contains(e)) {
            changed |= self.store.remove_from(*employee_id, task_id);
        }
        for (employee_id, task) in writes {
            if !self.resolve_employee(employee_id, &patch.employees) {
                continue;
            }
            if self.store.find_in(employee_id, task_id) != Some(&task) {
                changed |= self.store.upsert(employee_id, task);
            }
        }
        Ok(Outcome::from_changed(changed))
    }

    /// Applies a locally produced edit using the `task-updated` rules.
    ///
    /// # Errors
    ///
    /// Same as [`apply`](Self::apply).
    pub fn apply_local(&mut self, patch: &TaskPatch) -> Result<Outcome, ReconcileError> {
        self.apply_updated(patch)
    }

    /// Moves a task within one employee's list and renumbers the list.
    ///
    /// Returns one position patch per task whose position changed; these
    /// are the persistence requests to send. Moving to the same index
    /// changes nothing and returns no patches.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::UnknownEmployee`] for an employee without a
    /// group, or [`ReconcileError::IndexOutOfRange`] if either index is past
    /// the end of the list.
    pub fn reorder(
        &mut self,
        employee_id: EmployeeId,
        from: usize,
        to: usize,
    ) -> Result<Vec<TaskPatch>, ReconcileError> {
        let group = self
            .store
            .group(employee_id)
            .ok_or(ReconcileError::UnknownEmployee(employee_id))?;
        let mut tasks = group.tasks().to_vec();
        let len = tasks.len();
        for index in [from, to] {
            if index >= len {
                return Err(ReconcileError::IndexOutOfRange {
                    employee_id,
                    index,
                    len,
                });
            }
        }
        if from == to {
            return Ok(Vec::new());
        }

        let moved = tasks.remove(from);
        tasks.insert(to, moved);

        let mut patches = Vec::new();
        for (index, task) in tasks.iter_mut().enumerate() {
            let position = u32::try_from(index).unwrap_or(u32::MAX);
            if task.position != position {
                task.position = position;
                patches.push(TaskPatch::position(task.id, employee_id, position));
            }
        }
        debug!(%employee_id, from, to, changed = patches.len(), "list reordered");
        self.store.replace_list(employee_id, tasks);
        Ok(patches)
    }

    /// Sets an employee's active flag, as after a local toggle.
    pub fn set_employee_active(&mut self, employee_id: EmployeeId, active: bool) -> Outcome {
        Outcome::from_changed(self.store.set_active(employee_id, active))
    }

    /// Removes a task from every list and from the archive, as after a
    /// confirmed local delete.
    pub fn remove(&mut self, task_id: TaskId) -> Outcome {
        let listed = self.store.remove(task_id) > 0;
        let archived = self.store.unarchive(task_id).is_some();
        Outcome::from_changed(listed || archived)
    }

    /// Ensures a group exists for `employee_id`, creating it from an
    /// embedded payload if needed. Returns `false` if the employee stays
    /// unknown.
    fn resolve_employee(&mut self, employee_id: EmployeeId, embedded: &[EmployeeRecord]) -> bool {
        if self.store.contains_group(employee_id) {
            return true;
        }
        if let Some(record) = embedded.iter().find(|e| e.id == employee_id) {
            debug!(%employee_id, "group created from embedded payload");
            self.store.insert_group(record);
            return true;
        }
        trace!(%employee_id, "event names unknown employee, skipped");
        false
    }
}

/// Builds a task from a patch that carries every required field.
fn task_from_patch(task_id: TaskId, patch: &TaskPatch) -> Option<Task> {
    Some(Task {
        id: task_id,
        title: patch.title.clone()?,
        description: patch.description.clone().unwrap_or_default(),
        start_date: patch.start_date?,
        due_date: patch.due_date?,
        completion_date: patch.completion_date,
        priority: patch.priority,
        status: patch.status.unwrap_or_default(),
        position: patch.position.unwrap_or(0),
        assignees: patch.employee_ids.clone().unwrap_or_default(),
    })
}
