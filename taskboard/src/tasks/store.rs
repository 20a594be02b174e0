//! Per-employee ordered task lists.
//!
//! `TaskStore` is the single source of truth for what the board shows. Each
//! known employee owns a group holding that employee's active tasks, kept
//! sorted by position. Sorting is stable, so tasks with equal positions keep
//! their last known order. Completed tasks leave the lists and sit in a
//! separate archive keyed by task id.

use std::collections::{BTreeMap, HashMap};

use taskboard_proto::employee::{EmployeeId, EmployeeRecord, Gender};
use taskboard_proto::task::{Task, TaskId, TaskRecord};

/// One employee's column on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeGroup {
    /// Employee this group belongs to.
    pub employee_id: EmployeeId,
    /// `"first last"` as shown in the column header.
    pub display_name: String,
    /// Drives the avatar icon.
    pub gender: Gender,
    /// Whether the employee currently has a live push connection.
    pub online: bool,
    /// Whether the admin has the employee marked active.
    pub active: bool,
    tasks: Vec<Task>,
}

impl EmployeeGroup {
    /// Creates an empty group for an employee profile.
    #[must_use]
    pub fn from_record(record: &EmployeeRecord) -> Self {
        Self {
            employee_id: record.id,
            display_name: record.display_name(),
            gender: record.gender,
            online: false,
            active: record.active,
            tasks: Vec::new(),
        }
    }

    /// Active tasks in display order.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    fn sort(&mut self) {
        self.tasks.sort_by_key(|t| t.position);
    }
}

/// Map from employee to that employee's ordered active tasks, plus the
/// archive of completed tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    groups: BTreeMap<EmployeeId, EmployeeGroup>,
    completed: BTreeMap<TaskId, Task>,
}

impl TaskStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a group for `record` if none exists.
    ///
    /// An existing group keeps its tasks; only the profile fields are
    /// refreshed. Returns `true` when a new group was created.
    pub fn insert_group(&mut self, record: &EmployeeRecord) -> bool {
        if let Some(group) = self.groups.get_mut(&record.id) {
            group.display_name = record.display_name();
            group.gender = record.gender;
            group.active = record.active;
            return false;
        }
        self.groups
            .insert(record.id, EmployeeGroup::from_record(record));
        true
    }

    /// Whether the employee has a group on the board.
    #[must_use]
    pub fn contains_group(&self, employee_id: EmployeeId) -> bool {
        self.groups.contains_key(&employee_id)
    }

    /// Looks up one employee's group.
    #[must_use]
    pub fn group(&self, employee_id: EmployeeId) -> Option<&EmployeeGroup> {
        self.groups.get(&employee_id)
    }

    /// All groups ordered by employee id.
    pub fn groups(&self) -> impl Iterator<Item = &EmployeeGroup> {
        self.groups.values()
    }

    /// Inserts or replaces `task` in one employee's list, then re-sorts.
    ///
    /// A replaced task keeps its slot before sorting, so equal positions do
    /// not reshuffle. A new task is appended after any equal-position peers.
    /// Returns `false` (and does nothing) when the employee has no group.
    pub fn upsert(&mut self, employee_id: EmployeeId, task: Task) -> bool {
        let Some(group) = self.groups.get_mut(&employee_id) else {
            return false;
        };
        if let Some(slot) = group.tasks.iter_mut().find(|t| t.id == task.id) {
            *slot = task;
        } else {
            group.tasks.push(task);
        }
        group.sort();
        true
    }

    /// Removes a task from every list. Returns how many copies were removed.
    pub fn remove(&mut self, task_id: TaskId) -> usize {
        self.groups
            .values_mut()
            .map(|group| {
                let before = group.tasks.len();
                group.tasks.retain(|t| t.id != task_id);
                before - group.tasks.len()
            })
            .sum()
    }

    /// Removes a task from one employee's list.
    pub fn remove_from(&mut self, employee_id: EmployeeId, task_id: TaskId) -> bool {
        let Some(group) = self.groups.get_mut(&employee_id) else {
            return false;
        };
        let before = group.tasks.len();
        group.tasks.retain(|t| t.id != task_id);
        before != group.tasks.len()
    }

    /// Snapshot of one employee's ordered list; empty for unknown employees.
    #[must_use]
    pub fn read(&self, employee_id: EmployeeId) -> Vec<Task> {
        self.groups
            .get(&employee_id)
            .map(|g| g.tasks.clone())
            .unwrap_or_default()
    }

    /// The copy of a task held in a specific employee's list.
    #[must_use]
    pub fn find_in(&self, employee_id: EmployeeId, task_id: TaskId) -> Option<&Task> {
        self.groups
            .get(&employee_id)?
            .tasks
            .iter()
            .find(|t| t.id == task_id)
    }

    /// Any copy of a task, from the lowest employee id that holds it.
    #[must_use]
    pub fn find(&self, task_id: TaskId) -> Option<&Task> {
        self.groups
            .values()
            .find_map(|g| g.tasks.iter().find(|t| t.id == task_id))
    }

    /// Employees whose lists currently hold the task.
    #[must_use]
    pub fn holders(&self, task_id: TaskId) -> Vec<EmployeeId> {
        self.groups
            .values()
            .filter(|g| g.tasks.iter().any(|t| t.id == task_id))
            .map(|g| g.employee_id)
            .collect()
    }

    /// Replaces a whole list with an already ordered sequence.
    pub fn replace_list(&mut self, employee_id: EmployeeId, tasks: Vec<Task>) -> bool {
        let Some(group) = self.groups.get_mut(&employee_id) else {
            return false;
        };
        group.tasks = tasks;
        group.sort();
        true
    }

    /// Updates an employee's presence flag. Returns `true` if it changed.
    pub fn set_online(&mut self, employee_id: EmployeeId, online: bool) -> bool {
        match self.groups.get_mut(&employee_id) {
            Some(group) if group.online != online => {
                group.online = online;
                true
            }
            _ => false,
        }
    }

    /// Updates an employee's active flag. Returns `true` if it changed.
    pub fn set_active(&mut self, employee_id: EmployeeId, active: bool) -> bool {
        match self.groups.get_mut(&employee_id) {
            Some(group) if group.active != active => {
                group.active = active;
                true
            }
            _ => false,
        }
    }

    /// Stores a completed task in the archive, replacing any older copy.
    /// Returns `false` when the archive already held an identical copy.
    pub fn archive(&mut self, task: Task) -> bool {
        if self.completed.get(&task.id) == Some(&task) {
            return false;
        }
        self.completed.insert(task.id, task);
        true
    }

    /// Takes a task out of the archive.
    pub fn unarchive(&mut self, task_id: TaskId) -> Option<Task> {
        self.completed.remove(&task_id)
    }

    /// The archived copy of a completed task.
    #[must_use]
    pub fn archived(&self, task_id: TaskId) -> Option<&Task> {
        self.completed.get(&task_id)
    }

    /// Every archived task, by id.
    pub fn archived_tasks(&self) -> impl Iterator<Item = &Task> {
        self.completed.values()
    }

    /// Number of archived tasks.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Total number of task copies across all lists.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.groups.values().map(|g| g.tasks.len()).sum()
    }

    /// Replaces the whole store with a server snapshot.
    ///
    /// Rows without an id are dropped. Completed rows go to the archive,
    /// once per task. Rows naming an employee missing from `employees` are
    /// skipped. Within a list, equal positions are ordered by where the task
    /// sat before the reload, then by row order. Presence flags survive the
    /// reload. Returns the number of rows that were skipped.
    pub fn load_snapshot(&mut self, employees: &[EmployeeRecord], rows: &[TaskRecord]) -> usize {
        let previous = std::mem::take(&mut self.groups);
        self.completed.clear();
        let prior_rank = |employee_id: EmployeeId, task_id: TaskId| -> usize {
            previous
                .get(&employee_id)
                .and_then(|g| g.tasks.iter().position(|t| t.id == task_id))
                .unwrap_or(usize::MAX)
        };

        for record in employees {
            let mut group = EmployeeGroup::from_record(record);
            group.online = previous.get(&record.id).is_some_and(|g| g.online);
            self.groups.insert(record.id, group);
        }

        let mut skipped = 0;
        let mut staged: HashMap<EmployeeId, Vec<Task>> = HashMap::new();
        for row in rows {
            let Ok(task) = Task::try_from(row) else {
                skipped += 1;
                continue;
            };
            if !row.status.is_active() {
                if row
                    .target_employees()
                    .iter()
                    .any(|id| self.groups.contains_key(id))
                {
                    self.completed.entry(task.id).or_insert(task);
                } else {
                    skipped += 1;
                }
                continue;
            }
            for employee_id in row.target_employees() {
                if self.groups.contains_key(&employee_id) {
                    staged.entry(employee_id).or_default().push(task.clone());
                } else {
                    skipped += 1;
                }
            }
        }

        for (employee_id, mut tasks) in staged {
            tasks.sort_by_key(|t| (t.position, prior_rank(employee_id, t.id)));
            if let Some(group) = self.groups.get_mut(&employee_id) {
                group.tasks = tasks;
            }
        }
        skipped
    }
}
