//! Search projection over the [`TaskStore`].
//!
//! The projection is derived on demand and never stored. A group is kept
//! when its employee's display name matches the query (all tasks shown) or
//! when at least one task title matches (only those tasks shown). Matching
//! is a case-insensitive substring test; an empty query shows everything.
//!
//! [`completed_by_date`] derives the completed-task listing from the
//! store's archive, grouped by completion day and then by employee.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use taskboard_proto::employee::{EmployeeId, Gender};
use taskboard_proto::task::Task;

use super::store::{EmployeeGroup, TaskStore};

/// One visible column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupView {
    /// Employee the column belongs to.
    pub employee_id: EmployeeId,
    /// Column header.
    pub display_name: String,
    /// Avatar selector.
    pub gender: Gender,
    /// Presence flag.
    pub online: bool,
    /// Admin active flag.
    pub active: bool,
    /// Visible tasks in display order.
    pub tasks: Vec<Task>,
    /// Whether the group is shown because its name matched.
    pub matched_by_name: bool,
}

impl GroupView {
    fn from_group(group: &EmployeeGroup, tasks: Vec<Task>, matched_by_name: bool) -> Self {
        Self {
            employee_id: group.employee_id,
            display_name: group.display_name.clone(),
            gender: group.gender,
            online: group.online,
            active: group.active,
            tasks,
            matched_by_name,
        }
    }
}

/// Which employees the board shows, by their admin active flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Roster {
    /// Every employee.
    #[default]
    All,
    /// Only employees marked active.
    Active,
    /// Only employees marked inactive.
    Inactive,
}

impl Roster {
    /// Whether a column with this active flag is shown.
    #[must_use]
    pub const fn admits(self, active: bool) -> bool {
        match self {
            Self::All => true,
            Self::Active => active,
            Self::Inactive => !active,
        }
    }

    /// The next roster in the All, Active, Inactive cycle.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::All => Self::Active,
            Self::Active => Self::Inactive,
            Self::Inactive => Self::All,
        }
    }

    /// Short label for the status bar.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

/// One employee's completed tasks on one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedGroup {
    /// Employee the tasks are assigned to.
    pub employee_id: EmployeeId,
    /// Column header.
    pub display_name: String,
    /// Completed tasks ordered by id.
    pub tasks: Vec<Task>,
}

/// Completed tasks sharing a completion day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedDay {
    /// Completion day; `None` for tasks completed without a recorded date.
    pub date: Option<NaiveDate>,
    /// Per-employee groups ordered by employee id.
    pub groups: Vec<CompletedGroup>,
}

/// The filtered board.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    /// Query that produced this projection.
    pub query: String,
    /// Visible columns ordered by employee id.
    pub groups: Vec<GroupView>,
    /// Completed tasks, newest day first.
    pub completed: Vec<CompletedDay>,
}

impl Projection {
    /// Total visible task cards.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.groups.iter().map(|g| g.tasks.len()).sum()
    }

    /// Keeps only the columns `roster` admits.
    #[must_use]
    pub fn with_roster(mut self, roster: Roster) -> Self {
        self.groups.retain(|g| roster.admits(g.active));
        self
    }

    /// Every completed task listed, in display order.
    pub fn completed_tasks(&self) -> impl Iterator<Item = &Task> {
        self.completed
            .iter()
            .flat_map(|day| day.groups.iter())
            .flat_map(|group| group.tasks.iter())
    }
}

/// Derives the visible board for `query`.
#[must_use]
pub fn project(store: &TaskStore, query: &str) -> Projection {
    let needle = query.trim().to_lowercase();
    let groups = store
        .groups()
        .filter_map(|group| {
            if needle.is_empty() {
                return Some(GroupView::from_group(group, group.tasks().to_vec(), false));
            }
            if group.display_name.to_lowercase().contains(&needle) {
                return Some(GroupView::from_group(group, group.tasks().to_vec(), true));
            }
            let tasks: Vec<Task> = group
                .tasks()
                .iter()
                .filter(|t| t.title.to_lowercase().contains(&needle))
                .cloned()
                .collect();
            (!tasks.is_empty()).then(|| GroupView::from_group(group, tasks, false))
        })
        .collect();
    Projection {
        query: query.to_string(),
        groups,
        completed: Vec::new(),
    }
}

/// Groups the archived tasks by completion day, newest first, then by
/// assignee. With `on` set only that day is listed. A task shared by
/// several employees appears under each one the store knows.
#[must_use]
pub fn completed_by_date(store: &TaskStore, on: Option<NaiveDate>) -> Vec<CompletedDay> {
    let mut days: BTreeMap<Option<NaiveDate>, BTreeMap<EmployeeId, Vec<Task>>> = BTreeMap::new();
    for task in store.archived_tasks() {
        if on.is_some() && task.completion_date != on {
            continue;
        }
        for employee_id in &task.assignees {
            if store.contains_group(*employee_id) {
                days.entry(task.completion_date)
                    .or_default()
                    .entry(*employee_id)
                    .or_default()
                    .push(task.clone());
            }
        }
    }
    days.into_iter()
        .rev()
        .map(|(date, employees)| CompletedDay {
            date,
            groups: employees
                .into_iter()
                .filter_map(|(employee_id, tasks)| {
                    let group = store.group(employee_id)?;
                    Some(CompletedGroup {
                        employee_id,
                        display_name: group.display_name.clone(),
                        tasks,
                    })
                })
                .collect(),
        })
        .collect()
}
