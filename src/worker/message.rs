//! Messages sent to a per-target worker.

use url::Url;

use crate::fetch::FetchCache;
use crate::types::{Claim, ClaimId, TargetResolution};

/// One unit of work for a per-target worker.
///
/// Workers receive these via `tokio::sync::mpsc` and process them serially,
/// which is what makes reconcile-then-persist atomic per target.
#[derive(Debug)]
pub enum WorkerMessage {
    /// A claim whose target already resolved to this worker's key.
    ///
    /// `cache` is the claim's private fetch cache, pre-warmed by the
    /// dispatcher's redirect probes; the worker's source fetch reuses it.
    Claim {
        claim_id: ClaimId,
        claim: Claim,
        resolution: TargetResolution,
        cache: FetchCache,
        callback: Option<Url>,
    },

    /// Finish the current claim and exit the event loop.
    Shutdown,
}
