//! Transient solver-proposed assignments.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shiftplan_db::models::{NewAssignment, PartOfDay};

use crate::key::{AssignmentKey, HasAssignmentKey};

/// A shift assignment proposed by the solver, not yet persisted.
///
/// Consumed by deduplication and protection filtering; either becomes a
/// status-0 assignment row via the reconciler or is discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedAssignment {
    pub roster_id: Uuid,
    pub employee_id: Uuid,
    pub date: NaiveDate,
    pub part_of_day: PartOfDay,
    pub service_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_note: Option<String>,
}

impl ProposedAssignment {
    /// Convert into the insert payload for a given reconciliation run.
    #[must_use]
    pub fn into_new_assignment(self, run_id: Uuid) -> NewAssignment {
        NewAssignment {
            roster_id: self.roster_id,
            employee_id: self.employee_id,
            date: self.date,
            part_of_day: self.part_of_day,
            service_id: self.service_id,
            confidence: self.confidence,
            run_id,
            reason_note: self.reason_note,
        }
    }
}

impl HasAssignmentKey for ProposedAssignment {
    fn assignment_key(&self) -> AssignmentKey {
        AssignmentKey::new(self.roster_id, self.employee_id, self.date, self.part_of_day)
    }
}
