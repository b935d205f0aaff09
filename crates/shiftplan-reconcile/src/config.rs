//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the reconciler writes the filtered proposal set.
///
/// The two strategies are deliberate alternatives, not layered fallbacks;
/// the one in force is stamped on every audit row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteStrategy {
    /// Delete all open solver rows, then bulk-insert the new set. Avoids
    /// upsert key-collision failure modes; an insert failure after the
    /// delete surfaces as a distinct partial-reconciliation error.
    #[default]
    DeleteThenInsert,
    /// Fixed-size upsert batches against the composite-key constraint,
    /// guarded by a pre-flight per-batch duplicate check.
    BatchedUpsert,
}

impl fmt::Display for WriteStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeleteThenInsert => write!(f, "delete_then_insert"),
            Self::BatchedUpsert => write!(f, "batched_upsert"),
        }
    }
}

impl std::str::FromStr for WriteStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "delete_then_insert" => Ok(Self::DeleteThenInsert),
            "batched_upsert" => Ok(Self::BatchedUpsert),
            _ => Err(format!("Unknown write strategy: {}", s)),
        }
    }
}

/// Configuration for the reconciliation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Rows per bulk statement.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Solver call timeout in seconds.
    #[serde(default = "default_solver_timeout_secs")]
    pub solver_timeout_secs: u64,
    /// Write strategy in force.
    #[serde(default)]
    pub strategy: WriteStrategy,
}

fn default_batch_size() -> usize {
    500
}

fn default_solver_timeout_secs() -> u64 {
    35
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            solver_timeout_secs: default_solver_timeout_secs(),
            strategy: WriteStrategy::default(),
        }
    }
}
