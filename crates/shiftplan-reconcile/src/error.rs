//! Engine error taxonomy.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::key::AssignmentKey;
use crate::solver::SolverError;
use crate::store::StoreError;

/// Classification of a [`ReconcileError`] for callers deciding between
/// "nothing to do", "safe to retry", and "needs investigation".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SolverUnreachable,
    RosterBusy,
    InvalidProposal,
    BatchConflict,
    PartialReconciliation,
    IntegrityViolation,
    Storage,
}

/// Errors raised by a reconciliation run.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Solver call failed or timed out; nothing was written.
    #[error("solver unreachable: {message}")]
    SolverUnreachable { message: String },

    /// Another reconciliation run holds the roster lock.
    #[error("a reconciliation run is already in progress for roster {roster_id}")]
    RosterBusy { roster_id: Uuid },

    /// A proposal failed structural validation before the pipeline ran.
    #[error("invalid proposal: {message}")]
    InvalidProposal { message: String },

    /// A write batch still contained two rows with one key. The dedup and
    /// filter pipeline broke its contract; raised before the store can fail
    /// ambiguously on the whole batch.
    #[error("duplicate key {key} in write batch {batch_index}")]
    BatchConflict {
        batch_index: usize,
        key: AssignmentKey,
    },

    /// The delete step committed but an insert failed. The roster holds
    /// fewer solver suggestions than intended until the next run.
    #[error(
        "partial reconciliation: deleted {deleted} rows, wrote {written} before failing: {message}"
    )]
    PartialReconciliation {
        deleted: u64,
        written: u64,
        message: String,
    },

    /// Protected-category or total counts drifted across the run.
    #[error("integrity violation: {}", .violations.join("; "))]
    IntegrityViolation { violations: Vec<String> },

    /// Underlying storage failure.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ReconcileError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SolverUnreachable { .. } => ErrorKind::SolverUnreachable,
            Self::RosterBusy { .. } => ErrorKind::RosterBusy,
            Self::InvalidProposal { .. } => ErrorKind::InvalidProposal,
            Self::BatchConflict { .. } => ErrorKind::BatchConflict,
            Self::PartialReconciliation { .. } => ErrorKind::PartialReconciliation,
            Self::IntegrityViolation { .. } => ErrorKind::IntegrityViolation,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Whether a plain re-run may succeed.
    ///
    /// Batch conflicts and integrity violations indicate a logic bug and
    /// need investigation, not a retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::SolverUnreachable
                | ErrorKind::RosterBusy
                | ErrorKind::PartialReconciliation
                | ErrorKind::Storage
        )
    }
}

impl From<SolverError> for ReconcileError {
    fn from(err: SolverError) -> Self {
        Self::SolverUnreachable {
            message: err.to_string(),
        }
    }
}

/// Result type for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;
