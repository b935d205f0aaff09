//! Protected-key filtering of deduplicated proposals.

use std::collections::HashSet;

use crate::key::{AssignmentKey, HasAssignmentKey};
use crate::proposal::ProposedAssignment;

/// Proposals surviving the protection filter, plus those dropped.
#[derive(Debug, Clone, Default)]
pub struct Filtered {
    pub kept: Vec<ProposedAssignment>,
    /// Keys of proposals dropped because a protected record holds them.
    /// Reported separately from duplicate removals.
    pub skipped_keys: Vec<AssignmentKey>,
}

/// Drop every proposal whose key collides with a protected record.
///
/// Runs strictly after deduplication: dedup decides *the* candidate for a
/// key, and only that candidate is checked here. Checking protection first
/// could let a duplicate through whose earlier copy checked clean.
#[must_use]
pub fn filter_protected(
    proposals: Vec<ProposedAssignment>,
    protected_keys: &HashSet<AssignmentKey>,
) -> Filtered {
    let mut kept = Vec::with_capacity(proposals.len());
    let mut skipped_keys = Vec::new();

    for proposal in proposals {
        let key = proposal.assignment_key();
        if protected_keys.contains(&key) {
            skipped_keys.push(key);
        } else {
            kept.push(proposal);
        }
    }

    Filtered { kept, skipped_keys }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shiftplan_db::models::PartOfDay;
    use uuid::Uuid;

    fn proposal(employee: u128) -> ProposedAssignment {
        ProposedAssignment {
            roster_id: Uuid::from_u128(1),
            employee_id: Uuid::from_u128(employee),
            date: NaiveDate::from_ymd_opt(2025, 11, 24).unwrap(),
            part_of_day: PartOfDay::Morning,
            service_id: Uuid::from_u128(0xA),
            confidence: None,
            reason_note: None,
        }
    }

    #[test]
    fn drops_only_protected_keys() {
        let keep_me = proposal(1);
        let drop_me = proposal(3);
        let protected: HashSet<AssignmentKey> =
            [drop_me.assignment_key()].into_iter().collect();

        let result = filter_protected(vec![keep_me.clone(), drop_me.clone()], &protected);

        assert_eq!(result.kept, vec![keep_me]);
        assert_eq!(result.skipped_keys, vec![drop_me.assignment_key()]);
    }

    #[test]
    fn empty_protected_set_keeps_everything() {
        let result = filter_protected(vec![proposal(1), proposal(2)], &HashSet::new());
        assert_eq!(result.kept.len(), 2);
        assert!(result.skipped_keys.is_empty());
    }
}
