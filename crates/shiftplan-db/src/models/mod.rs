//! Persisted models.

pub mod assignment;
pub mod reconciliation_run;

pub use assignment::{
    AssignmentRecord, AssignmentSource, AssignmentStatus, NewAssignment, PartOfDay, StatusCountRow,
};
pub use reconciliation_run::{ReconciliationRun, RunCounts, RunStatus};
