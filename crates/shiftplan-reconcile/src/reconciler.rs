//! Persisted-state mutation strategies.

use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

use shiftplan_db::models::NewAssignment;

use crate::config::{ReconcileConfig, WriteStrategy};
use crate::error::{ReconcileError, ReconcileResult};
use crate::key::{AssignmentKey, HasAssignmentKey};
use crate::store::AssignmentStore;

/// Counters from the write phase of one run.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteStats {
    /// Previous solver rows removed (delete-then-insert only).
    pub deleted: u64,
    /// Rows written.
    pub written: u64,
}

/// Executes the configured write strategy against the store.
///
/// Input rows must already be deduplicated and protection-filtered; the
/// pre-flight batch check exists to catch a pipeline that failed to hold
/// that contract, not to relax it.
pub struct Reconciler<'a> {
    store: &'a dyn AssignmentStore,
    config: &'a ReconcileConfig,
}

impl<'a> Reconciler<'a> {
    #[must_use]
    pub fn new(store: &'a dyn AssignmentStore, config: &'a ReconcileConfig) -> Self {
        Self { store, config }
    }

    /// Replace the roster's overwritable rows with `rows`.
    ///
    /// Idempotent under both strategies: re-running with the same row set
    /// yields the same persisted state.
    pub async fn write(&self, roster_id: Uuid, rows: &[NewAssignment]) -> ReconcileResult<WriteStats> {
        match self.config.strategy {
            WriteStrategy::DeleteThenInsert => self.delete_then_insert(roster_id, rows).await,
            WriteStrategy::BatchedUpsert => self.batched_upsert(roster_id, rows).await,
        }
    }

    async fn delete_then_insert(
        &self,
        roster_id: Uuid,
        rows: &[NewAssignment],
    ) -> ReconcileResult<WriteStats> {
        let deleted = self.store.delete_open_solver_rows(roster_id).await?;
        debug!(roster_id = %roster_id, deleted, "Removed previous solver suggestions");

        let mut written = 0u64;
        for chunk in rows.chunks(self.config.batch_size.max(1)) {
            match self.store.insert_assignments(chunk).await {
                Ok(count) => written += count,
                Err(source) => {
                    // The delete already committed: the roster now holds
                    // fewer suggestions than intended until a re-run.
                    return Err(ReconcileError::PartialReconciliation {
                        deleted,
                        written,
                        message: source.to_string(),
                    });
                }
            }
        }

        Ok(WriteStats { deleted, written })
    }

    async fn batched_upsert(
        &self,
        roster_id: Uuid,
        rows: &[NewAssignment],
    ) -> ReconcileResult<WriteStats> {
        let mut written = 0u64;
        for (batch_index, chunk) in rows.chunks(self.config.batch_size.max(1)).enumerate() {
            if let Some(key) = duplicate_in_batch(chunk) {
                return Err(ReconcileError::BatchConflict { batch_index, key });
            }
            written += self.store.upsert_assignments(chunk).await?;
        }
        debug!(roster_id = %roster_id, written, "Upserted proposal batches");
        Ok(WriteStats { deleted: 0, written })
    }
}

/// Pre-flight check for the upsert strategy.
///
/// A batch holding two rows with one key would make the store reject the
/// whole statement (two conflicting updates to one row); catch it here with
/// a precise error instead of surfacing the store's own message.
#[must_use]
pub fn duplicate_in_batch(rows: &[NewAssignment]) -> Option<AssignmentKey> {
    let mut seen = HashSet::with_capacity(rows.len());
    for row in rows {
        let key = row.assignment_key();
        if !seen.insert(key) {
            return Some(key);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shiftplan_db::models::PartOfDay;

    fn row(employee: u128, part: PartOfDay) -> NewAssignment {
        NewAssignment {
            roster_id: Uuid::from_u128(1),
            employee_id: Uuid::from_u128(employee),
            date: NaiveDate::from_ymd_opt(2025, 11, 24).unwrap(),
            part_of_day: part,
            service_id: Uuid::from_u128(0xA),
            confidence: None,
            run_id: Uuid::from_u128(0xF),
            reason_note: None,
        }
    }

    #[test]
    fn clean_batch_passes_preflight() {
        let rows = vec![
            row(1, PartOfDay::Morning),
            row(1, PartOfDay::Evening),
            row(2, PartOfDay::Morning),
        ];
        assert_eq!(duplicate_in_batch(&rows), None);
    }

    #[test]
    fn duplicate_key_in_batch_is_caught() {
        let rows = vec![
            row(1, PartOfDay::Morning),
            row(2, PartOfDay::Morning),
            row(1, PartOfDay::Morning),
        ];
        assert_eq!(duplicate_in_batch(&rows), Some(rows[0].assignment_key()));
    }
}
