//! Employee and owner identities.

use serde::{Deserialize, Serialize};

/// Identifier of an employee (a task assignee).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployeeId(u64);

impl EmployeeId {
    /// Wraps a raw identifier.
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

impl std::fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an admin who owns a set of employees and their tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(u64);

impl OwnerId {
    /// Wraps a raw identifier.
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

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Gender as recorded on the employee profile. Only affects the icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    /// Male.
    Male,
    /// Female.
    Female,
    /// Anything else, or not provided.
    #[default]
    Other,
}

/// An employee profile as served by the REST service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    /// Employee identifier.
    pub id: EmployeeId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Gender for the card icon.
    #[serde(default)]
    pub gender: Gender,
    /// Admin this employee reports to.
    pub owner_id: OwnerId,
    /// Whether the admin has the employee marked active.
    #[serde(default = "active_by_default")]
    pub active: bool,
}

const fn active_by_default() -> bool {
    true
}

impl EmployeeRecord {
    /// Display name shown on the employee's column: `"first last"`.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Body of an activate/deactivate request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeStatusUpdate {
    /// New value of the active flag.
    pub active: bool,
}

/// Body of an add-employee request; the service assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeDraft {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Gender for the card icon.
    #[serde(default)]
    pub gender: Gender,
    /// Admin adding the employee.
    pub owner_id: OwnerId,
}
