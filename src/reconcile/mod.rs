//! Reconciliation of interpreted candidates against stored mentions.
//!
//! Pure set arithmetic: no I/O, no clock. The orchestrator loads the stored
//! mentions for a target, calls [`reconcile`], and applies the result through
//! the mention store.
//!
//! Identity is the exact `source_url`. A candidate whose source already has a
//! stored mention becomes an update; an unknown source becomes a create. A
//! stored mention whose source is absent from the batch is left alone:
//! absence is not deletion, which only ever arrives as an explicit 410
//! signal through [`ReconcileResult::to_mark_deleted`].

use crate::types::{MentionCandidate, PersistedMention, ReconcileResult};

/// Computes the changes one interpreted batch implies for a target.
///
/// Candidates sharing a `source_url` collapse to the last one in batch
/// order, at the position the source first appeared. An update identical to
/// the live stored record is dropped, so re-delivering an unchanged source
/// is a no-op; a tombstoned record always takes the update, which resurrects
/// it.
pub fn reconcile(
    candidates: Vec<MentionCandidate>,
    existing: &[PersistedMention],
) -> ReconcileResult {
    let mut result = ReconcileResult::default();

    for candidate in dedup_by_source(candidates) {
        match existing
            .iter()
            .find(|m| m.candidate.source_url == candidate.source_url)
        {
            Some(stored) if !stored.deleted && stored.candidate == candidate => {}
            Some(stored) => result.to_update.push((stored.id, candidate)),
            None => result.to_create.push(candidate),
        }
    }

    result
}

/// Collapses candidates with the same source URL, keeping the last
/// occurrence's data at the first occurrence's position.
fn dedup_by_source(candidates: Vec<MentionCandidate>) -> Vec<MentionCandidate> {
    let mut out: Vec<MentionCandidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match out
            .iter_mut()
            .find(|c| c.source_url == candidate.source_url)
        {
            Some(slot) => *slot = candidate,
            None => out.push(candidate),
        }
    }
    out
}
