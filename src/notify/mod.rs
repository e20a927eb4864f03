//! Downstream change notification.
//!
//! Fired after a claim actually changes stored state, so site plumbing
//! (cache invalidation, page re-rendering) can react. Failures here are the
//! notifier's problem; the protocol outcome is already decided.

use async_trait::async_trait;
use tracing::debug;

use crate::store::AppliedCounts;
use crate::types::TargetKey;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn mentions_changed(&self, target: TargetKey, counts: AppliedCounts);
}

/// Logs and does nothing else. Used by tests and the demo binary.
#[derive(Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn mentions_changed(&self, target: TargetKey, counts: AppliedCounts) {
        debug!(
            %target,
            created = counts.created,
            updated = counts.updated,
            deleted = counts.deleted,
            "mentions changed"
        );
    }
}
