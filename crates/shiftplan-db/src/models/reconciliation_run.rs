//! Reconciliation run audit trail.
//!
//! One row per reconciliation attempt for a roster: which strategy ran, how
//! it ended, and the counters the engine reported. Purely an audit sink;
//! failures writing here never fail a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use std::fmt;
use uuid::Uuid;

/// Status of a reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Run is currently executing.
    Running,
    /// Run wrote and validated its proposal set.
    Completed,
    /// Solver produced no usable assignment; nothing was written.
    NoOp,
    /// Run failed with error.
    Failed,
}

impl RunStatus {
    /// Check if this status is terminal (run has ended).
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::NoOp => write!(f, "no_op"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "no_op" => Ok(Self::NoOp),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown run status: {}", s)),
        }
    }
}

/// Counters reported for one run, stored in the `counts` JSONB column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    /// Proposals received from the solver.
    #[serde(default)]
    pub proposed: u64,
    /// Rows written to the store.
    #[serde(default)]
    pub written: u64,
    /// Proposals dropped as duplicate keys.
    #[serde(default)]
    pub duplicates_removed: u64,
    /// Proposals dropped because their key was protected.
    #[serde(default)]
    pub protected_skipped: u64,
}

/// A reconciliation run audit record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReconciliationRun {
    pub id: Uuid,
    pub roster_id: Uuid,
    /// Write strategy in force for this run.
    pub strategy: String,
    pub status: RunStatus,
    pub counts: JsonValue,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReconciliationRun {
    /// Decode the counters column.
    #[must_use]
    pub fn counts(&self) -> RunCounts {
        serde_json::from_value(self.counts.clone()).unwrap_or_default()
    }

    /// Open a new run row in `running` state.
    pub async fn create(
        pool: &PgPool,
        roster_id: Uuid,
        strategy: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r#"
            INSERT INTO roster_reconciliation_runs (roster_id, strategy, status, started_at)
            VALUES ($1, $2, 'running', NOW())
            RETURNING *
            "#,
        )
        .bind(roster_id)
        .bind(strategy)
        .fetch_one(pool)
        .await
    }

    /// Close a run row with its final status and counters.
    pub async fn complete(
        pool: &PgPool,
        id: Uuid,
        status: RunStatus,
        counts: &RunCounts,
        error_message: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        let counts = serde_json::to_value(counts).unwrap_or_default();
        sqlx::query_as(
            r#"
            UPDATE roster_reconciliation_runs
            SET status = $2,
                counts = $3,
                error_message = $4,
                completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(counts)
        .bind(error_message)
        .fetch_one(pool)
        .await
    }

    /// Find run by ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM roster_reconciliation_runs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Run history for a roster, newest first.
    pub async fn list_for_roster(
        pool: &PgPool,
        roster_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM roster_reconciliation_runs
            WHERE roster_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(roster_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// The roster's most recent completed run, if any.
    pub async fn last_completed(
        pool: &PgPool,
        roster_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM roster_reconciliation_runs
            WHERE roster_id = $1 AND status = 'completed'
            ORDER BY completed_at DESC
            LIMIT 1
            "#,
        )
        .bind(roster_id)
        .fetch_optional(pool)
        .await
    }
}
