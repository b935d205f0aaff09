//! In-memory store and recorder doubles for engine tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use shiftplan_db::models::{
    AssignmentRecord, AssignmentSource, AssignmentStatus, NewAssignment, RunCounts, RunStatus,
};
use shiftplan_reconcile::config::WriteStrategy;
use shiftplan_reconcile::key::{AssignmentKey, HasAssignmentKey};
use shiftplan_reconcile::proposal::ProposedAssignment;
use shiftplan_reconcile::recorder::RunRecorder;
use shiftplan_reconcile::snapshot::StatusCounts;
use shiftplan_reconcile::store::{AssignmentStore, StoreError};

pub fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 24).unwrap()
}

/// A persisted record in a given status, keyed by employee number.
pub fn record(
    roster_id: Uuid,
    employee: u128,
    service: u128,
    status: AssignmentStatus,
    source: AssignmentSource,
) -> AssignmentRecord {
    AssignmentRecord {
        id: Uuid::new_v4(),
        roster_id,
        employee_id: Uuid::from_u128(employee),
        date: date(),
        part_of_day: shiftplan_db::models::PartOfDay::Morning,
        service_id: Some(Uuid::from_u128(service)),
        status,
        source,
        confidence: None,
        run_id: None,
        reason_note: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn open_solver_record(roster_id: Uuid, employee: u128, service: u128) -> AssignmentRecord {
    record(
        roster_id,
        employee,
        service,
        AssignmentStatus::Open,
        AssignmentSource::SolverSuggestion,
    )
}

pub fn proposal(roster_id: Uuid, employee: u128, service: u128) -> ProposedAssignment {
    ProposedAssignment {
        roster_id,
        employee_id: Uuid::from_u128(employee),
        date: date(),
        part_of_day: shiftplan_db::models::PartOfDay::Morning,
        service_id: Uuid::from_u128(service),
        confidence: Some(0.9),
        reason_note: None,
    }
}

/// In-memory assignment table keyed by composite identity.
#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<HashMap<AssignmentKey, AssignmentRecord>>,
    locks: RwLock<HashSet<Uuid>>,
    /// When set, the next insert call fails once.
    pub fail_next_insert: AtomicBool,
    pub insert_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub upsert_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, record: AssignmentRecord) {
        self.rows
            .write()
            .await
            .insert(record.assignment_key(), record);
    }

    pub async fn seed_all(&self, records: impl IntoIterator<Item = AssignmentRecord>) {
        let mut rows = self.rows.write().await;
        for record in records {
            rows.insert(record.assignment_key(), record);
        }
    }

    pub async fn get(&self, key: &AssignmentKey) -> Option<AssignmentRecord> {
        self.rows.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub fn mutation_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
            + self.delete_calls.load(Ordering::SeqCst)
            + self.upsert_calls.load(Ordering::SeqCst)
    }

    fn record_from_new(row: &NewAssignment) -> AssignmentRecord {
        AssignmentRecord {
            id: Uuid::new_v4(),
            roster_id: row.roster_id,
            employee_id: row.employee_id,
            date: row.date,
            part_of_day: row.part_of_day,
            service_id: Some(row.service_id),
            status: AssignmentStatus::Open,
            source: AssignmentSource::SolverSuggestion,
            confidence: row.confidence,
            run_id: Some(row.run_id),
            reason_note: row.reason_note.clone(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

#[async_trait]
impl AssignmentStore for MemoryStore {
    async fn list_assignments(
        &self,
        roster_id: Uuid,
    ) -> Result<Vec<AssignmentRecord>, StoreError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|record| record.roster_id == roster_id)
            .cloned()
            .collect())
    }

    async fn count_by_status(&self, roster_id: Uuid) -> Result<StatusCounts, StoreError> {
        let rows = self.rows.read().await;
        Ok(StatusCounts::from_records(
            rows.values().filter(|record| record.roster_id == roster_id),
        ))
    }

    async fn count_open_solver_rows(&self, roster_id: Uuid) -> Result<u64, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|record| {
                record.roster_id == roster_id
                    && record.status == AssignmentStatus::Open
                    && record.source == AssignmentSource::SolverSuggestion
            })
            .count() as u64)
    }

    async fn delete_open_solver_rows(&self, roster_id: Uuid) -> Result<u64, StoreError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, record| {
            !(record.roster_id == roster_id
                && record.status == AssignmentStatus::Open
                && record.source == AssignmentSource::SolverSuggestion)
        });
        Ok((before - rows.len()) as u64)
    }

    async fn insert_assignments(&self, batch: &[NewAssignment]) -> Result<u64, StoreError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_next_insert.swap(false, Ordering::SeqCst) {
            return Err(StoreError::backend("injected insert failure"));
        }
        let mut rows = self.rows.write().await;
        for row in batch {
            let key = row.assignment_key();
            if rows.contains_key(&key) {
                // Same behavior as the unique index on the real table.
                return Err(StoreError::backend(format!(
                    "unique constraint violated for key {key}"
                )));
            }
            rows.insert(key, Self::record_from_new(row));
        }
        Ok(batch.len() as u64)
    }

    async fn upsert_assignments(&self, batch: &[NewAssignment]) -> Result<u64, StoreError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.write().await;
        let mut written = 0u64;
        for row in batch {
            let key = row.assignment_key();
            match rows.get_mut(&key) {
                Some(existing) if existing.status.is_protected() => {
                    // Guarded conflict action: protected rows are skipped.
                }
                Some(existing) => {
                    existing.service_id = Some(row.service_id);
                    existing.source = AssignmentSource::SolverSuggestion;
                    existing.confidence = row.confidence;
                    existing.run_id = Some(row.run_id);
                    existing.reason_note = row.reason_note.clone();
                    existing.updated_at = Utc::now();
                    written += 1;
                }
                None => {
                    rows.insert(key, Self::record_from_new(row));
                    written += 1;
                }
            }
        }
        Ok(written)
    }

    async fn try_lock_roster(&self, roster_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.locks.write().await.insert(roster_id))
    }

    async fn unlock_roster(&self, roster_id: Uuid) -> Result<(), StoreError> {
        self.locks.write().await.remove(&roster_id);
        Ok(())
    }
}

/// One recorded audit row.
#[derive(Debug, Clone)]
pub struct RecordedRun {
    pub id: Uuid,
    pub roster_id: Uuid,
    pub strategy: WriteStrategy,
    pub status: RunStatus,
    pub counts: RunCounts,
    pub error_message: Option<String>,
}

/// Recorder double keeping runs in memory.
#[derive(Default)]
pub struct MemoryRecorder {
    pub runs: RwLock<Vec<RecordedRun>>,
    /// When set, every recorder call fails; runs must still succeed.
    pub fail_all: AtomicBool,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend an earlier run completed having written `written` rows.
    pub async fn seed_completed(&self, roster_id: Uuid, written: u64) {
        self.runs.write().await.push(RecordedRun {
            id: Uuid::new_v4(),
            roster_id,
            strategy: WriteStrategy::DeleteThenInsert,
            status: RunStatus::Completed,
            counts: RunCounts {
                proposed: written,
                written,
                ..RunCounts::default()
            },
            error_message: None,
        });
    }

    pub async fn last_run(&self) -> Option<RecordedRun> {
        self.runs.read().await.last().cloned()
    }

    fn check_failure(&self) -> Result<(), StoreError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(StoreError::backend("injected recorder failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl RunRecorder for MemoryRecorder {
    async fn create_run(
        &self,
        roster_id: Uuid,
        strategy: WriteStrategy,
    ) -> Result<Uuid, StoreError> {
        self.check_failure()?;
        let id = Uuid::new_v4();
        self.runs.write().await.push(RecordedRun {
            id,
            roster_id,
            strategy,
            status: RunStatus::Running,
            counts: RunCounts::default(),
            error_message: None,
        });
        Ok(id)
    }

    async fn complete_run(
        &self,
        run_id: Uuid,
        status: RunStatus,
        counts: &RunCounts,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        self.check_failure()?;
        let mut runs = self.runs.write().await;
        if let Some(run) = runs.iter_mut().find(|run| run.id == run_id) {
            run.status = status;
            run.counts = *counts;
            run.error_message = error_message.map(ToString::to_string);
        }
        Ok(())
    }

    async fn last_completed_counts(
        &self,
        roster_id: Uuid,
    ) -> Result<Option<RunCounts>, StoreError> {
        self.check_failure()?;
        let runs = self.runs.read().await;
        Ok(runs
            .iter()
            .rev()
            .find(|run| run.roster_id == roster_id && run.status == RunStatus::Completed)
            .map(|run| run.counts))
    }
}
