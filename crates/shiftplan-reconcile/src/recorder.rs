//! Run audit recording.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use shiftplan_db::models::{ReconciliationRun, RunCounts, RunStatus};

use crate::config::WriteStrategy;
use crate::store::StoreError;

/// Audit-trail sink: one row per reconciliation attempt.
///
/// Recorder failures must never block or fail a run; the engine logs them
/// and moves on.
#[async_trait]
pub trait RunRecorder: Send + Sync {
    /// Open a run row; returns its id.
    async fn create_run(
        &self,
        roster_id: Uuid,
        strategy: WriteStrategy,
    ) -> Result<Uuid, StoreError>;

    /// Close a run row with its final status and counters.
    async fn complete_run(
        &self,
        run_id: Uuid,
        status: RunStatus,
        counts: &RunCounts,
        error_message: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Counters of the roster's most recent completed run, if any.
    async fn last_completed_counts(
        &self,
        roster_id: Uuid,
    ) -> Result<Option<RunCounts>, StoreError>;
}

/// Postgres-backed recorder over `roster_reconciliation_runs`.
pub struct PgRunRecorder {
    pool: PgPool,
}

impl PgRunRecorder {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RunRecorder for PgRunRecorder {
    async fn create_run(
        &self,
        roster_id: Uuid,
        strategy: WriteStrategy,
    ) -> Result<Uuid, StoreError> {
        let run = ReconciliationRun::create(&self.pool, roster_id, &strategy.to_string()).await?;
        Ok(run.id)
    }

    async fn complete_run(
        &self,
        run_id: Uuid,
        status: RunStatus,
        counts: &RunCounts,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        ReconciliationRun::complete(&self.pool, run_id, status, counts, error_message).await?;
        Ok(())
    }

    async fn last_completed_counts(
        &self,
        roster_id: Uuid,
    ) -> Result<Option<RunCounts>, StoreError> {
        let run = ReconciliationRun::last_completed(&self.pool, roster_id).await?;
        Ok(run.map(|r| r.counts()))
    }
}
