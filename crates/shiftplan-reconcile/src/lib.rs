//! Write-back reconciliation engine for solver-proposed roster assignments.
//!
//! Takes a batch of proposed shift assignments from the external scheduling
//! solver and merges it into the persisted roster without touching rows a
//! planner has fixed or that mark blocked/unavailable slots, and without
//! ever letting a duplicate composite identity reach the store.
//!
//! One run moves through strictly sequential phases:
//!
//! ```text
//! solver batch ──► dedup (last wins) ──► protection filter ──► write
//!                                               ▲                 │
//!                  frozen roster snapshot ──────┘                 ▼
//!                        before-counts ─────────────────► integrity check
//! ```
//!
//! The protection snapshot is read exactly once at run start and treated as
//! frozen; same-roster runs are serialized through a roster-scoped lock on
//! the store.

pub mod config;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod filter;
pub mod integrity;
pub mod key;
pub mod proposal;
pub mod protection;
pub mod reconciler;
pub mod recorder;
pub mod snapshot;
pub mod solver;
pub mod store;

pub use config::{ReconcileConfig, WriteStrategy};
pub use dedup::{dedup_last_wins, Deduplicated, RemovedDuplicate};
pub use engine::{
    ReconcileOutcome, ReconciliationEngine, RunCompletion, RunError, RunReport,
};
pub use error::{ErrorKind, ReconcileError, ReconcileResult};
pub use filter::{filter_protected, Filtered};
pub use integrity::IntegrityReport;
pub use key::{AssignmentKey, HasAssignmentKey};
pub use proposal::ProposedAssignment;
pub use protection::ProtectionSnapshot;
pub use recorder::{PgRunRecorder, RunRecorder};
pub use snapshot::StatusCounts;
pub use solver::{SolveRequest, SolveResponse, SolverClient, SolverError, SolverSlot, SolverStatus};
pub use store::{AssignmentStore, PgAssignmentStore, StoreError};
