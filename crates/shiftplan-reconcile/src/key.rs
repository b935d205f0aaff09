//! Canonical composite identity of an assignment.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use shiftplan_db::models::{AssignmentRecord, NewAssignment, PartOfDay};

/// Composite identity of an assignment slot: roster, employee, date, part
/// of day.
///
/// This type is the single source of truth for what counts as a duplicate
/// or a conflict anywhere in the engine. Components compare keys, never raw
/// field tuples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentKey {
    pub roster_id: Uuid,
    pub employee_id: Uuid,
    pub date: NaiveDate,
    pub part_of_day: PartOfDay,
}

impl AssignmentKey {
    #[must_use]
    pub fn new(roster_id: Uuid, employee_id: Uuid, date: NaiveDate, part_of_day: PartOfDay) -> Self {
        Self {
            roster_id,
            employee_id,
            date,
            part_of_day,
        }
    }

    /// Canonical string form: `roster|employee|date|part_of_day`, fixed
    /// order and separator.
    #[must_use]
    pub fn canonical(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.roster_id, self.employee_id, self.date, self.part_of_day
        )
    }
}

impl fmt::Display for AssignmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// Accessor implemented by every record-like type carrying the four
/// identity fields.
pub trait HasAssignmentKey {
    fn assignment_key(&self) -> AssignmentKey;
}

impl HasAssignmentKey for AssignmentRecord {
    fn assignment_key(&self) -> AssignmentKey {
        AssignmentKey::new(self.roster_id, self.employee_id, self.date, self.part_of_day)
    }
}

impl HasAssignmentKey for NewAssignment {
    fn assignment_key(&self) -> AssignmentKey {
        AssignmentKey::new(self.roster_id, self.employee_id, self.date, self.part_of_day)
    }
}
