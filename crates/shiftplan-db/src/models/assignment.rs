//! Roster assignment records.
//!
//! One row per occupied (roster, employee, date, part-of-day) slot. The
//! composite identity is unique among persisted rows, backstopped by an
//! index behind the engine's own deduplication, and the `status` column
//! alone decides whether a row may be rewritten by a reconciliation run.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::fmt;
use uuid::Uuid;

/// Lifecycle status of an assignment slot, stored as `SMALLINT`.
///
/// This enum is the single authoritative mapping from status code to
/// protection semantics. Nothing else re-derives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    /// Open slot carrying a solver suggestion; freely replaced by runs.
    Open = 0,
    /// Fixed by a human planner; read-only for the reconciler.
    Fixed = 1,
    /// Slot blocked, e.g. a prior shift carries over.
    Blocked = 2,
    /// Employee unavailable or on leave.
    Unavailable = 3,
}

impl AssignmentStatus {
    /// Whether a row with this status must survive a reconciliation run
    /// untouched.
    #[must_use]
    pub fn is_protected(self) -> bool {
        !matches!(self, Self::Open)
    }

    /// The wire/storage code.
    #[must_use]
    pub fn code(self) -> i16 {
        self as i16
    }

    /// Parse a storage code.
    #[must_use]
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(Self::Open),
            1 => Some(Self::Fixed),
            2 => Some(Self::Blocked),
            3 => Some(Self::Unavailable),
            _ => None,
        }
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Fixed => write!(f, "fixed"),
            Self::Blocked => write!(f, "blocked"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Part of the day a shift covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PartOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl fmt::Display for PartOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Morning => write!(f, "morning"),
            Self::Afternoon => write!(f, "afternoon"),
            Self::Evening => write!(f, "evening"),
        }
    }
}

impl std::str::FromStr for PartOfDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "morning" => Ok(Self::Morning),
            "afternoon" => Ok(Self::Afternoon),
            "evening" => Ok(Self::Evening),
            _ => Err(format!("Unknown part of day: {}", s)),
        }
    }
}

/// Where an assignment row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AssignmentSource {
    /// Entered or edited by a planner.
    Manual,
    /// Written back from a solver run.
    SolverSuggestion,
}

impl fmt::Display for AssignmentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::SolverSuggestion => write!(f, "solver_suggestion"),
        }
    }
}

impl std::str::FromStr for AssignmentSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "solver_suggestion" => Ok(Self::SolverSuggestion),
            _ => Err(format!("Unknown assignment source: {}", s)),
        }
    }
}

/// A persisted roster assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AssignmentRecord {
    pub id: Uuid,
    pub roster_id: Uuid,
    pub employee_id: Uuid,
    pub date: NaiveDate,
    pub part_of_day: PartOfDay,
    /// Service the employee is assigned to. Only transiently `None`; never
    /// `None` once the row is written with a status code.
    pub service_id: Option<Uuid>,
    pub status: AssignmentStatus,
    pub source: AssignmentSource,
    /// Solver confidence, only meaningful for solver-sourced rows.
    pub confidence: Option<f64>,
    /// Run that produced the row; `None` for manual rows.
    pub run_id: Option<Uuid>,
    pub reason_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a solver-sourced assignment row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAssignment {
    pub roster_id: Uuid,
    pub employee_id: Uuid,
    pub date: NaiveDate,
    pub part_of_day: PartOfDay,
    pub service_id: Uuid,
    pub confidence: Option<f64>,
    pub run_id: Uuid,
    pub reason_note: Option<String>,
}

/// One bucket of a per-status count query.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct StatusCountRow {
    pub status: AssignmentStatus,
    pub count: i64,
}

impl AssignmentRecord {
    /// All assignment rows for a roster.
    pub async fn list_for_roster(
        pool: &PgPool,
        roster_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM roster_assignments
            WHERE roster_id = $1
            ORDER BY date, part_of_day, employee_id
            "#,
        )
        .bind(roster_id)
        .fetch_all(pool)
        .await
    }

    /// Row counts grouped by status for a roster.
    pub async fn counts_by_status(
        pool: &PgPool,
        roster_id: Uuid,
    ) -> Result<Vec<StatusCountRow>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT status, COUNT(*) AS count
            FROM roster_assignments
            WHERE roster_id = $1
            GROUP BY status
            "#,
        )
        .bind(roster_id)
        .fetch_all(pool)
        .await
    }

    /// Number of open, solver-sourced rows for a roster.
    pub async fn count_open_solver(pool: &PgPool, roster_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM roster_assignments
            WHERE roster_id = $1 AND status = $2 AND source = $3
            "#,
        )
        .bind(roster_id)
        .bind(AssignmentStatus::Open)
        .bind(AssignmentSource::SolverSuggestion)
        .fetch_one(pool)
        .await
    }

    /// Delete the roster's open, solver-sourced rows. Returns rows removed.
    pub async fn delete_open_solver(pool: &PgPool, roster_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM roster_assignments
            WHERE roster_id = $1 AND status = $2 AND source = $3
            "#,
        )
        .bind(roster_id)
        .bind(AssignmentStatus::Open)
        .bind(AssignmentSource::SolverSuggestion)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Bulk-insert solver rows. Returns rows written.
    pub async fn insert_batch(pool: &PgPool, rows: &[NewAssignment]) -> Result<u64, sqlx::Error> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO roster_assignments \
             (roster_id, employee_id, date, part_of_day, service_id, status, source, \
              confidence, run_id, reason_note) ",
        );
        builder.push_values(rows, |mut b, row| {
            b.push_bind(row.roster_id)
                .push_bind(row.employee_id)
                .push_bind(row.date)
                .push_bind(row.part_of_day)
                .push_bind(row.service_id)
                .push_bind(AssignmentStatus::Open)
                .push_bind(AssignmentSource::SolverSuggestion)
                .push_bind(row.confidence)
                .push_bind(row.run_id)
                .push_bind(row.reason_note.clone());
        });
        let result = builder.build().execute(pool).await?;
        Ok(result.rows_affected())
    }

    /// Bulk-upsert solver rows against the composite-key constraint.
    ///
    /// The conflict action carries a `status = 0` guard so a colliding
    /// protected row is left untouched rather than updated. Returns rows
    /// written (inserted or updated; skipped protected conflicts are not
    /// counted).
    pub async fn upsert_batch(pool: &PgPool, rows: &[NewAssignment]) -> Result<u64, sqlx::Error> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO roster_assignments \
             (roster_id, employee_id, date, part_of_day, service_id, status, source, \
              confidence, run_id, reason_note) ",
        );
        builder.push_values(rows, |mut b, row| {
            b.push_bind(row.roster_id)
                .push_bind(row.employee_id)
                .push_bind(row.date)
                .push_bind(row.part_of_day)
                .push_bind(row.service_id)
                .push_bind(AssignmentStatus::Open)
                .push_bind(AssignmentSource::SolverSuggestion)
                .push_bind(row.confidence)
                .push_bind(row.run_id)
                .push_bind(row.reason_note.clone());
        });
        builder.push(
            " ON CONFLICT (roster_id, employee_id, date, part_of_day) DO UPDATE SET \
             service_id = EXCLUDED.service_id, \
             source = EXCLUDED.source, \
             confidence = EXCLUDED.confidence, \
             run_id = EXCLUDED.run_id, \
             reason_note = EXCLUDED.reason_note, \
             updated_at = NOW() \
             WHERE roster_assignments.status = 0",
        );
        let result = builder.build().execute(pool).await?;
        Ok(result.rows_affected())
    }
}
