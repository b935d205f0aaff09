//! Proposal deduplication.

use serde::Serialize;
use std::collections::HashMap;

use crate::key::{AssignmentKey, HasAssignmentKey};
use crate::proposal::ProposedAssignment;

/// A proposal discarded because a later occurrence carried the same key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemovedDuplicate {
    pub key: AssignmentKey,
    /// Position of the discarded occurrence in the input sequence.
    pub index: usize,
}

/// Result of deduplicating one proposal batch.
#[derive(Debug, Clone, Default)]
pub struct Deduplicated {
    /// At most one proposal per key, in first-seen key order.
    pub kept: Vec<ProposedAssignment>,
    /// The occurrences that were discarded.
    pub removed: Vec<RemovedDuplicate>,
}

/// Collapse a solver batch to at most one proposal per [`AssignmentKey`].
///
/// Later occurrences win: when a key repeats, the entry latest in the input
/// replaces the earlier one in place. The solver emits revisions in output
/// order, so the last occurrence is its final decision for that slot.
#[must_use]
pub fn dedup_last_wins(proposals: Vec<ProposedAssignment>) -> Deduplicated {
    let mut kept: Vec<ProposedAssignment> = Vec::with_capacity(proposals.len());
    // key -> (slot in `kept`, input index of the occurrence currently held)
    let mut slots: HashMap<AssignmentKey, (usize, usize)> = HashMap::with_capacity(proposals.len());
    let mut removed = Vec::new();

    for (index, proposal) in proposals.into_iter().enumerate() {
        let key = proposal.assignment_key();
        match slots.get_mut(&key) {
            Some((slot, held_index)) => {
                removed.push(RemovedDuplicate {
                    key,
                    index: *held_index,
                });
                kept[*slot] = proposal;
                *held_index = index;
            }
            None => {
                slots.insert(key, (kept.len(), index));
                kept.push(proposal);
            }
        }
    }

    Deduplicated { kept, removed }
}
