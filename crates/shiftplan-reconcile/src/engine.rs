//! Reconciliation run orchestration.
//!
//! One run moves through strictly sequential phases: frozen protection
//! read, dedup, protection filter, write, post-write snapshot, integrity
//! check. The roster lock serializes same-roster runs; runs for different
//! rosters are independent.

use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use shiftplan_db::models::{NewAssignment, RunCounts, RunStatus};

use crate::config::ReconcileConfig;
use crate::dedup::{dedup_last_wins, RemovedDuplicate};
use crate::error::{ErrorKind, ReconcileError, ReconcileResult};
use crate::filter::filter_protected;
use crate::integrity::IntegrityReport;
use crate::key::AssignmentKey;
use crate::proposal::ProposedAssignment;
use crate::protection::ProtectionSnapshot;
use crate::reconciler::Reconciler;
use crate::recorder::RunRecorder;
use crate::solver::{SolveRequest, SolverClient, SolverStatus};
use crate::store::AssignmentStore;

/// Result of one successful reconcile call.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOutcome {
    /// Rows written to the store.
    pub written: u64,
    /// Proposals dropped as duplicates (last occurrence kept).
    pub duplicates_removed: usize,
    /// Keys and input positions of the discarded duplicate occurrences.
    pub duplicate_details: Vec<RemovedDuplicate>,
    /// Proposals dropped because their key collides with a protected record.
    pub protected_skipped: usize,
    /// The protected keys that were skipped.
    pub protected_keys: Vec<AssignmentKey>,
    /// Whether the post-write snapshot matched the pre-write snapshot.
    pub integrity_ok: bool,
    /// Violation descriptions when it did not.
    pub violations: Vec<String>,
}

/// Completion status of an orchestrated run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunCompletion {
    /// Proposals were written and validated.
    Completed,
    /// The solver found no usable assignment; nothing was written.
    NoOp,
    /// The run failed; see the error details.
    Failed,
}

/// Error details carried by a failed [`RunReport`].
#[derive(Debug, Clone, Serialize)]
pub struct RunError {
    pub kind: ErrorKind,
    pub message: String,
    /// Whether a plain re-run may succeed.
    pub retryable: bool,
}

/// Structured report of one orchestrated run.
///
/// Every failure mode ends up here rather than in an opaque exception, so
/// the caller can tell "nothing to do" from "retry" from "do not trust this
/// result".
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub roster_id: Uuid,
    /// Audit run id, when the recorder accepted the run.
    pub run_id: Option<Uuid>,
    pub completion: RunCompletion,
    /// Solver verdict, when the solver was reached.
    pub solver_status: Option<SolverStatus>,
    pub outcome: Option<ReconcileOutcome>,
    pub error: Option<RunError>,
}

/// Orchestrates reconciliation runs against one store.
pub struct ReconciliationEngine {
    store: Arc<dyn AssignmentStore>,
    recorder: Arc<dyn RunRecorder>,
    solver: Option<SolverClient>,
    config: ReconcileConfig,
}

impl ReconciliationEngine {
    #[must_use]
    pub fn new(store: Arc<dyn AssignmentStore>, recorder: Arc<dyn RunRecorder>) -> Self {
        Self {
            store,
            recorder,
            solver: None,
            config: ReconcileConfig::default(),
        }
    }

    /// Use a custom configuration.
    #[must_use]
    pub fn with_config(mut self, config: ReconcileConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach the solver client used by [`solve_and_reconcile`].
    ///
    /// [`solve_and_reconcile`]: Self::solve_and_reconcile
    #[must_use]
    pub fn with_solver(mut self, solver: SolverClient) -> Self {
        self.solver = Some(solver);
        self
    }

    /// Merge a proposal batch into the roster's persisted assignments.
    ///
    /// `run_id` is stamped on every written row. Same-roster calls are
    /// serialized through the store's roster lock; a held lock yields
    /// [`ReconcileError::RosterBusy`].
    pub async fn reconcile(
        &self,
        roster_id: Uuid,
        proposals: Vec<ProposedAssignment>,
        run_id: Uuid,
    ) -> ReconcileResult<ReconcileOutcome> {
        if !self.store.try_lock_roster(roster_id).await? {
            return Err(ReconcileError::RosterBusy { roster_id });
        }

        let result = self.reconcile_locked(roster_id, proposals, run_id).await;

        if let Err(err) = self.store.unlock_roster(roster_id).await {
            warn!(roster_id = %roster_id, error = %err, "Failed to release roster lock");
        }

        result
    }

    async fn reconcile_locked(
        &self,
        roster_id: Uuid,
        proposals: Vec<ProposedAssignment>,
        run_id: Uuid,
    ) -> ReconcileResult<ReconcileOutcome> {
        for proposal in &proposals {
            if proposal.roster_id != roster_id {
                return Err(ReconcileError::InvalidProposal {
                    message: format!(
                        "proposal for roster {} in a run for roster {}",
                        proposal.roster_id, roster_id
                    ),
                });
            }
        }

        let recovered_rows = self.detect_interrupted_run(roster_id).await;

        // Read the roster exactly once; the snapshot is frozen for the rest
        // of the run.
        let snapshot = ProtectionSnapshot::capture(self.store.as_ref(), roster_id).await?;

        let deduplicated = dedup_last_wins(proposals);
        let filtered = filter_protected(deduplicated.kept, &snapshot.protected_keys);

        info!(
            roster_id = %roster_id,
            run_id = %run_id,
            strategy = %self.config.strategy,
            writable = filtered.kept.len(),
            duplicates_removed = deduplicated.removed.len(),
            protected_skipped = filtered.skipped_keys.len(),
            "Writing reconciled proposal set"
        );

        let rows: Vec<NewAssignment> = filtered
            .kept
            .into_iter()
            .map(|proposal| proposal.into_new_assignment(run_id))
            .collect();

        let reconciler = Reconciler::new(self.store.as_ref(), &self.config);
        let stats = reconciler.write(roster_id, &rows).await?;

        let after = self.store.count_by_status(roster_id).await?;
        let report = IntegrityReport::compare(&snapshot.counts, &after, recovered_rows);
        if !report.ok {
            return Err(ReconcileError::IntegrityViolation {
                violations: report.violations,
            });
        }

        Ok(ReconcileOutcome {
            written: stats.written,
            duplicates_removed: deduplicated.removed.len(),
            duplicate_details: deduplicated.removed,
            protected_skipped: filtered.skipped_keys.len(),
            protected_keys: filtered.skipped_keys,
            integrity_ok: report.ok,
            violations: report.violations,
        })
    }

    /// Pre-run check for a prior interrupted delete/insert.
    ///
    /// When the roster holds fewer solver rows than the last completed run
    /// wrote, a prior run likely died between its delete and insert. The
    /// shortfall is the only growth the integrity check will allow; the
    /// run itself proceeds, since the missing rows are disposable
    /// suggestions a fresh reconciliation restores.
    async fn detect_interrupted_run(&self, roster_id: Uuid) -> u64 {
        let last_written = match self.recorder.last_completed_counts(roster_id).await {
            Ok(Some(counts)) => counts.written,
            Ok(None) => return 0,
            Err(err) => {
                warn!(roster_id = %roster_id, error = %err, "Could not read last completed run");
                return 0;
            }
        };
        let current = match self.store.count_open_solver_rows(roster_id).await {
            Ok(count) => count,
            Err(err) => {
                warn!(roster_id = %roster_id, error = %err, "Could not count solver rows");
                return 0;
            }
        };

        let shortfall = last_written.saturating_sub(current);
        if shortfall > 0 {
            warn!(
                roster_id = %roster_id,
                solver_rows = current,
                last_written,
                "Fewer solver suggestions than the last completed run wrote; a prior run may have been interrupted"
            );
        }
        shortfall
    }

    /// Call the solver for the roster's current state and reconcile its
    /// output, recording the attempt in the audit trail.
    ///
    /// Never returns an opaque error: solver failures, infeasibility, and
    /// every reconcile error come back as a structured [`RunReport`].
    pub async fn solve_and_reconcile(&self, roster_id: Uuid, constraints: JsonValue) -> RunReport {
        let Some(solver) = &self.solver else {
            return self.failed_report(
                roster_id,
                None,
                None,
                &ReconcileError::SolverUnreachable {
                    message: "no solver client configured".to_string(),
                },
                0,
            );
        };

        let run_id = match self.recorder.create_run(roster_id, self.config.strategy).await {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(roster_id = %roster_id, error = %err, "Failed to record run start");
                None
            }
        };

        let records = match self.store.list_assignments(roster_id).await {
            Ok(records) => records,
            Err(err) => {
                let err = ReconcileError::from(err);
                self.record_completion(run_id, RunStatus::Failed, &RunCounts::default(), Some(&err))
                    .await;
                return self.failed_report(roster_id, run_id, None, &err, 0);
            }
        };

        let request = SolveRequest::from_records(roster_id, &records, constraints);
        let response = match solver.solve(&request).await {
            Ok(response) => response,
            Err(err) => {
                let err = ReconcileError::from(err);
                self.record_completion(run_id, RunStatus::Failed, &RunCounts::default(), Some(&err))
                    .await;
                return self.failed_report(roster_id, run_id, None, &err, 0);
            }
        };

        if !response.solver_status.is_usable() {
            info!(
                roster_id = %roster_id,
                solver_status = %response.solver_status,
                "Solver produced no usable assignment; skipping reconciliation"
            );
            self.record_completion(run_id, RunStatus::NoOp, &RunCounts::default(), None)
                .await;
            return RunReport {
                roster_id,
                run_id,
                completion: RunCompletion::NoOp,
                solver_status: Some(response.solver_status),
                outcome: None,
                error: None,
            };
        }

        let proposed = response.assignments.len() as u64;
        let stamp = run_id.unwrap_or_else(Uuid::new_v4);
        match self.reconcile(roster_id, response.assignments, stamp).await {
            Ok(outcome) => {
                let counts = RunCounts {
                    proposed,
                    written: outcome.written,
                    duplicates_removed: outcome.duplicates_removed as u64,
                    protected_skipped: outcome.protected_skipped as u64,
                };
                self.record_completion(run_id, RunStatus::Completed, &counts, None)
                    .await;
                RunReport {
                    roster_id,
                    run_id,
                    completion: RunCompletion::Completed,
                    solver_status: Some(response.solver_status),
                    outcome: Some(outcome),
                    error: None,
                }
            }
            Err(err) => {
                let counts = RunCounts {
                    proposed,
                    ..RunCounts::default()
                };
                self.record_completion(run_id, RunStatus::Failed, &counts, Some(&err))
                    .await;
                self.failed_report(
                    roster_id,
                    run_id,
                    Some(response.solver_status),
                    &err,
                    proposed,
                )
            }
        }
    }

    async fn record_completion(
        &self,
        run_id: Option<Uuid>,
        status: RunStatus,
        counts: &RunCounts,
        error: Option<&ReconcileError>,
    ) {
        let Some(run_id) = run_id else { return };
        let message = error.map(ToString::to_string);
        if let Err(err) = self
            .recorder
            .complete_run(run_id, status, counts, message.as_deref())
            .await
        {
            warn!(run_id = %run_id, error = %err, "Failed to record run completion");
        }
    }

    fn failed_report(
        &self,
        roster_id: Uuid,
        run_id: Option<Uuid>,
        solver_status: Option<SolverStatus>,
        err: &ReconcileError,
        proposed: u64,
    ) -> RunReport {
        warn!(
            roster_id = %roster_id,
            kind = ?err.kind(),
            proposed,
            error = %err,
            "Reconciliation run failed"
        );
        RunReport {
            roster_id,
            run_id,
            completion: RunCompletion::Failed,
            solver_status,
            outcome: None,
            error: Some(RunError {
                kind: err.kind(),
                message: err.to_string(),
                retryable: err.is_retryable(),
            }),
        }
    }
}
