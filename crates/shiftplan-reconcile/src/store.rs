//! Storage access seam for the reconciliation engine.

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use shiftplan_db::models::{AssignmentRecord, NewAssignment};

use crate::snapshot::StatusCounts;

/// Errors surfaced by an [`AssignmentStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Backend failure outside the sqlx driver.
    #[error("storage error: {message}")]
    Backend { message: String },
}

impl StoreError {
    /// Create a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Roster-scoped persistence operations needed by one reconciliation run.
///
/// Implementations must not cache reads across calls: every read reflects
/// the current persisted state.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// All assignment records for a roster.
    async fn list_assignments(&self, roster_id: Uuid)
        -> Result<Vec<AssignmentRecord>, StoreError>;

    /// Per-status record counts for a roster.
    async fn count_by_status(&self, roster_id: Uuid) -> Result<StatusCounts, StoreError>;

    /// Number of open, solver-sourced rows for a roster.
    async fn count_open_solver_rows(&self, roster_id: Uuid) -> Result<u64, StoreError>;

    /// Delete the roster's open, solver-sourced rows. Returns rows removed.
    async fn delete_open_solver_rows(&self, roster_id: Uuid) -> Result<u64, StoreError>;

    /// Bulk-insert proposals as open solver rows. Returns rows written.
    async fn insert_assignments(&self, rows: &[NewAssignment]) -> Result<u64, StoreError>;

    /// Upsert one batch against the composite-key constraint. Existing
    /// protected rows are left untouched. Returns rows written.
    async fn upsert_assignments(&self, rows: &[NewAssignment]) -> Result<u64, StoreError>;

    /// Try to take the roster-scoped run lock. Returns `false` when another
    /// run already holds it.
    async fn try_lock_roster(&self, roster_id: Uuid) -> Result<bool, StoreError>;

    /// Release the roster-scoped run lock.
    async fn unlock_roster(&self, roster_id: Uuid) -> Result<(), StoreError>;
}

/// Postgres-backed store.
///
/// Stateless apart from the advisory-lock connections: every operation
/// checks its connection out of the pool, so reads always see current data
/// and nothing is cached across requests.
pub struct PgAssignmentStore {
    pool: PgPool,
    /// Connections holding a session advisory lock, per roster. The lock
    /// must be released on the connection that took it.
    lock_connections: Mutex<HashMap<Uuid, PoolConnection<Postgres>>>,
}

impl PgAssignmentStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lock_connections: Mutex::new(HashMap::new()),
        }
    }

    /// Advisory-lock key derived from the roster id (low 64 bits).
    fn lock_key(roster_id: Uuid) -> i64 {
        (roster_id.as_u128() & u128::from(u64::MAX)) as i64
    }
}

#[async_trait]
impl AssignmentStore for PgAssignmentStore {
    async fn list_assignments(
        &self,
        roster_id: Uuid,
    ) -> Result<Vec<AssignmentRecord>, StoreError> {
        Ok(AssignmentRecord::list_for_roster(&self.pool, roster_id).await?)
    }

    async fn count_by_status(&self, roster_id: Uuid) -> Result<StatusCounts, StoreError> {
        let rows = AssignmentRecord::counts_by_status(&self.pool, roster_id).await?;
        let mut counts = StatusCounts::default();
        for row in rows {
            counts.add(row.status, u64::try_from(row.count).unwrap_or(0));
        }
        Ok(counts)
    }

    async fn count_open_solver_rows(&self, roster_id: Uuid) -> Result<u64, StoreError> {
        let count = AssignmentRecord::count_open_solver(&self.pool, roster_id).await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn delete_open_solver_rows(&self, roster_id: Uuid) -> Result<u64, StoreError> {
        Ok(AssignmentRecord::delete_open_solver(&self.pool, roster_id).await?)
    }

    async fn insert_assignments(&self, rows: &[NewAssignment]) -> Result<u64, StoreError> {
        Ok(AssignmentRecord::insert_batch(&self.pool, rows).await?)
    }

    async fn upsert_assignments(&self, rows: &[NewAssignment]) -> Result<u64, StoreError> {
        Ok(AssignmentRecord::upsert_batch(&self.pool, rows).await?)
    }

    async fn try_lock_roster(&self, roster_id: Uuid) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let locked: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
            .bind(Self::lock_key(roster_id))
            .fetch_one(&mut *conn)
            .await?;
        if locked {
            self.lock_connections.lock().await.insert(roster_id, conn);
        }
        Ok(locked)
    }

    async fn unlock_roster(&self, roster_id: Uuid) -> Result<(), StoreError> {
        let conn = self.lock_connections.lock().await.remove(&roster_id);
        if let Some(mut conn) = conn {
            sqlx::query_scalar::<_, bool>("SELECT pg_advisory_unlock($1)")
                .bind(Self::lock_key(roster_id))
                .fetch_one(&mut *conn)
                .await?;
        }
        Ok(())
    }
}
