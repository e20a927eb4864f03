//! Claim disposition tracking.
//!
//! The acceptance layer answers `202` before anything is decided; this table
//! is where the eventual disposition lands, keyed by the minted claim ID.
//! The status endpoint reads it.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::protocol::WireOutcome;
use crate::types::ClaimId;

/// Where a claim currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimStatus {
    Pending,
    /// Terminal; the wire outcome is what a callback would have received.
    Done(WireOutcome),
}

impl ClaimStatus {
    /// The status endpoint's JSON: `{"status": "pending"}` while pending,
    /// the wire outcome itself (whose own `status` field is `success` or
    /// `error`) once done.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ClaimStatus::Pending => serde_json::json!({"status": "pending"}),
            ClaimStatus::Done(outcome) => {
                serde_json::to_value(outcome).unwrap_or_else(|_| serde_json::Value::Null)
            }
        }
    }
}

/// Shared claim status table.
#[derive(Debug, Default)]
pub struct ClaimTracker {
    claims: RwLock<HashMap<ClaimId, ClaimStatus>>,
}

impl ClaimTracker {
    pub fn new() -> Self {
        ClaimTracker::default()
    }

    /// Registers a freshly accepted claim as pending.
    pub async fn begin(&self, id: ClaimId) {
        self.claims.write().await.insert(id, ClaimStatus::Pending);
    }

    /// Records the terminal outcome for a claim.
    pub async fn complete(&self, id: &ClaimId, outcome: WireOutcome) {
        self.claims
            .write()
            .await
            .insert(id.clone(), ClaimStatus::Done(outcome));
    }

    /// Current status, `None` for IDs never accepted.
    pub async fn status(&self, id: &ClaimId) -> Option<ClaimStatus> {
        self.claims.read().await.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lifecycle() {
        let tracker = ClaimTracker::new();
        let id = ClaimId::random();

        assert_eq!(tracker.status(&id).await, None);

        tracker.begin(id.clone()).await;
        assert_eq!(tracker.status(&id).await, Some(ClaimStatus::Pending));

        tracker
            .complete(&id, WireOutcome::internal("persistence failure"))
            .await;
        match tracker.status(&id).await {
            Some(ClaimStatus::Done(outcome)) => {
                assert_eq!(outcome.response_code, 400);
            }
            other => panic!("expected done, got {:?}", other),
        }
    }

    #[test]
    fn done_json_is_the_wire_outcome() {
        let json = ClaimStatus::Done(WireOutcome::internal("persistence failure")).to_json();
        assert_eq!(json["status"], "error");
        assert_eq!(json["response_code"], 400);
        assert_eq!(json["reason"], "persistence failure");
    }

    #[test]
    fn pending_json_is_status_only() {
        let json = ClaimStatus::Pending.to_json();
        assert_eq!(json, serde_json::json!({"status": "pending"}));
    }
}
