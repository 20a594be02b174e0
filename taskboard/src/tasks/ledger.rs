//! Tracks optimistic edits until the REST service confirms or rejects them.

use taskboard_proto::task::TaskId;
use uuid::Uuid;

/// Identifies one in-flight mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MutationId(Uuid);

impl MutationId {
    fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl std::fmt::Display for MutationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of local edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Create request.
    Create,
    /// Field edit.
    Update,
    /// Status change to completed.
    Complete,
    /// Delete request.
    Delete,
    /// Drag-and-drop reorder; one request per moved task.
    Reorder,
    /// Completed task moved back to an active status.
    Reopen,
    /// Employee activated or deactivated; touches no task.
    EmployeeStatus,
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Complete => write!(f, "complete"),
            Self::Delete => write!(f, "delete"),
            Self::Reorder => write!(f, "reorder"),
            Self::Reopen => write!(f, "reopen"),
            Self::EmployeeStatus => write!(f, "employee status"),
        }
    }
}

/// One in-flight or confirmed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMutation {
    /// Ledger identifier.
    pub id: MutationId,
    /// What kind of edit this is.
    pub kind: MutationKind,
    /// Tasks touched by the edit.
    pub task_ids: Vec<TaskId>,
    /// Whether the service accepted every request of this edit.
    pub confirmed: bool,
}

/// Ordered record of local mutations.
#[derive(Debug, Default)]
pub struct MutationLedger {
    entries: Vec<PendingMutation>,
}

impl MutationLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new unconfirmed mutation.
    pub fn begin(&mut self, kind: MutationKind, task_ids: Vec<TaskId>) -> MutationId {
        let id = MutationId::new();
        self.entries.push(PendingMutation {
            id,
            kind,
            task_ids,
            confirmed: false,
        });
        id
    }

    /// Marks a mutation confirmed. Returns `false` if it is unknown.
    pub fn confirm(&mut self, id: MutationId) -> bool {
        match self.entries.iter_mut().find(|m| m.id == id) {
            Some(entry) => {
                entry.confirmed = true;
                true
            }
            None => false,
        }
    }

    /// Drops a failed mutation and returns it.
    pub fn fail(&mut self, id: MutationId) -> Option<PendingMutation> {
        let index = self.entries.iter().position(|m| m.id == id)?;
        Some(self.entries.remove(index))
    }

    /// Unconfirmed mutations in the order they began.
    pub fn pending(&self) -> impl Iterator<Item = &PendingMutation> {
        self.entries.iter().filter(|m| !m.confirmed)
    }

    /// Whether any unconfirmed mutation touches `task_id`.
    #[must_use]
    pub fn is_pending(&self, task_id: TaskId) -> bool {
        self.pending().any(|m| m.task_ids.contains(&task_id))
    }

    /// Forgets confirmed entries. Returns how many were dropped.
    pub fn prune_confirmed(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|m| !m.confirmed);
        before - self.entries.len()
    }

    /// Forgets everything; a fresh snapshot supersedes all local edits.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Total tracked entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ledger is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
