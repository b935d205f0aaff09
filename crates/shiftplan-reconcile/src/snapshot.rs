//! Per-status record counts for integrity comparison.

use serde::{Deserialize, Serialize};

use shiftplan_db::models::{AssignmentRecord, AssignmentStatus};

/// Counts of one roster's persisted assignment records grouped by status,
/// captured at a point in time.
///
/// Used only for before/after integrity comparison; persisted, if at all,
/// as part of a run's audit trail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub open: u64,
    pub fixed: u64,
    pub blocked: u64,
    pub unavailable: u64,
}

impl StatusCounts {
    /// Total records across all statuses.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.open + self.fixed + self.blocked + self.unavailable
    }

    /// Records in protected statuses.
    #[must_use]
    pub fn protected_total(&self) -> u64 {
        self.fixed + self.blocked + self.unavailable
    }

    /// Count for one status bucket.
    #[must_use]
    pub fn get(&self, status: AssignmentStatus) -> u64 {
        match status {
            AssignmentStatus::Open => self.open,
            AssignmentStatus::Fixed => self.fixed,
            AssignmentStatus::Blocked => self.blocked,
            AssignmentStatus::Unavailable => self.unavailable,
        }
    }

    /// Add to one status bucket.
    pub fn add(&mut self, status: AssignmentStatus, n: u64) {
        match status {
            AssignmentStatus::Open => self.open += n,
            AssignmentStatus::Fixed => self.fixed += n,
            AssignmentStatus::Blocked => self.blocked += n,
            AssignmentStatus::Unavailable => self.unavailable += n,
        }
    }

    /// Tally already-loaded records.
    #[must_use]
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a AssignmentRecord>,
    {
        let mut counts = Self::default();
        for record in records {
            counts.add(record.status, 1);
        }
        counts
    }
}
