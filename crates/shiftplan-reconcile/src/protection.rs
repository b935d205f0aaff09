//! Protection classification of persisted assignments.

use std::collections::HashSet;
use uuid::Uuid;

use shiftplan_db::models::AssignmentRecord;

use crate::key::{AssignmentKey, HasAssignmentKey};
use crate::snapshot::StatusCounts;
use crate::store::{AssignmentStore, StoreError};

/// Frozen view of a roster's persisted records, taken once at run start.
///
/// Partitions keys into protected (status ≥ 1) and overwritable (status 0)
/// and carries the "before" half of the integrity comparison. The snapshot
/// is never refreshed mid-run, so a concurrent planner edit cannot move the
/// protection boundary under a running reconciliation.
#[derive(Debug, Clone)]
pub struct ProtectionSnapshot {
    /// Keys the reconciler must never write to.
    pub protected_keys: HashSet<AssignmentKey>,
    /// Per-status counts at capture time.
    pub counts: StatusCounts,
}

impl ProtectionSnapshot {
    /// Partition already-loaded records.
    #[must_use]
    pub fn classify(records: &[AssignmentRecord]) -> Self {
        let mut protected_keys = HashSet::new();
        let mut counts = StatusCounts::default();
        for record in records {
            counts.add(record.status, 1);
            if record.status.is_protected() {
                protected_keys.insert(record.assignment_key());
            }
        }
        Self {
            protected_keys,
            counts,
        }
    }

    /// Read the roster's records once and classify them.
    pub async fn capture(
        store: &dyn AssignmentStore,
        roster_id: Uuid,
    ) -> Result<Self, StoreError> {
        let records = store.list_assignments(roster_id).await?;
        Ok(Self::classify(&records))
    }

    #[must_use]
    pub fn is_protected(&self, key: &AssignmentKey) -> bool {
        self.protected_keys.contains(key)
    }
}
