//! Before/after snapshot validation.

use serde::Serialize;

use crate::snapshot::StatusCounts;

/// Outcome of comparing the pre-run snapshot against the post-run one.
///
/// A failed comparison is fatal to the run even when the write itself
/// succeeded: protected-category drift means the protection logic is broken
/// and must not hide behind a success response.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub ok: bool,
    pub violations: Vec<String>,
}

impl IntegrityReport {
    /// Compare snapshots taken before and after the write phase.
    ///
    /// The open count may change arbitrarily; every protected category and
    /// the roster's total row count must not. `recovered_rows` is the
    /// shortfall detected by the pre-run interrupted-run check (rows a
    /// prior aborted run deleted without replacing) and is the only growth
    /// the total is allowed.
    #[must_use]
    pub fn compare(before: &StatusCounts, after: &StatusCounts, recovered_rows: u64) -> Self {
        let mut violations = Vec::new();

        if before.fixed != after.fixed {
            violations.push(format!(
                "fixed (status=1) count drifted: {} -> {}",
                before.fixed, after.fixed
            ));
        }
        if before.blocked != after.blocked {
            violations.push(format!(
                "blocked (status=2) count drifted: {} -> {}",
                before.blocked, after.blocked
            ));
        }
        if before.unavailable != after.unavailable {
            violations.push(format!(
                "unavailable (status=3) count drifted: {} -> {}",
                before.unavailable, after.unavailable
            ));
        }

        let expected_total = before.total() + recovered_rows;
        if expected_total != after.total() {
            violations.push(format!(
                "total record count drifted: {} -> {}",
                expected_total,
                after.total()
            ));
        }

        Self {
            ok: violations.is_empty(),
            violations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(open: u64, fixed: u64, blocked: u64, unavailable: u64) -> StatusCounts {
        StatusCounts {
            open,
            fixed,
            blocked,
            unavailable,
        }
    }

    #[test]
    fn identical_snapshots_pass() {
        let before = counts(10, 4, 2, 1);
        let report = IntegrityReport::compare(&before, &before, 0);
        assert!(report.ok);
        assert!(report.violations.is_empty());
    }

    #[test]
    fn total_drift_fails_even_when_protected_counts_hold() {
        let report = IntegrityReport::compare(&counts(3, 4, 0, 0), &counts(2, 4, 0, 0), 0);
        assert!(!report.ok);
        assert_eq!(report.violations.len(), 1);
        assert!(report.violations[0].contains("total record count drifted: 7 -> 6"));
    }

    #[test]
    fn protected_drift_is_named_with_counts() {
        let report = IntegrityReport::compare(&counts(5, 40, 2, 1), &counts(7, 38, 2, 1), 0);
        assert!(!report.ok);
        assert!(report
            .violations
            .iter()
            .any(|v| v == "fixed (status=1) count drifted: 40 -> 38"));
    }

    #[test]
    fn recovered_rows_extend_the_expected_total() {
        // A prior interrupted run deleted 3 solver rows without replacing
        // them; the recovery run may grow the total by exactly that much.
        let report = IntegrityReport::compare(&counts(0, 4, 0, 0), &counts(3, 4, 0, 0), 3);
        assert!(report.ok);

        let overgrown = IntegrityReport::compare(&counts(0, 4, 0, 0), &counts(5, 4, 0, 0), 3);
        assert!(!overgrown.ok);
    }

    #[test]
    fn multiple_violations_are_all_reported() {
        let report = IntegrityReport::compare(&counts(5, 4, 2, 1), &counts(5, 3, 1, 1), 0);
        assert!(!report.ok);
        assert_eq!(report.violations.len(), 3);
    }
}
