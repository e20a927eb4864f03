//! Claim dispatch: validate, resolve, route to per-target workers.
//!
//! The acceptance layer answers `202` and hands the raw form fields here.
//! The dispatcher runs the read-only stages (claim validation, target
//! resolution), records early rejections, and routes surviving claims to a
//! worker keyed by the resolved target. Claims for the same target are
//! strictly serialized by that worker's event loop; claims for different
//! targets run concurrently.
//!
//! Workers are created lazily when the first claim for a target arrives,
//! and all honor the dispatcher's shutdown token.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace};

use crate::fetch::FetchCache;
use crate::protocol::{wire, Engine, ProtocolOutcome, RejectReason, WireOutcome};
use crate::types::{Claim, ClaimId, TargetKey};
use url::Url;

use super::message::WorkerMessage;
use super::tracking::ClaimTracker;
use super::worker::TargetWorker;

/// Channel buffer size for worker messages.
const WORKER_CHANNEL_BUFFER: usize = 100;

/// Per-target worker handle.
struct WorkerHandle {
    tx: mpsc::Sender<WorkerMessage>,

    #[allow(dead_code)]
    task: JoinHandle<()>,
}

/// Routes accepted claims to per-target workers.
///
/// Thread-safe; shared across HTTP handler tasks behind an `Arc`.
pub struct Dispatcher {
    engine: Arc<Engine>,
    tracker: Arc<ClaimTracker>,
    workers: RwLock<HashMap<TargetKey, WorkerHandle>>,
    shutdown: CancellationToken,
}

impl Dispatcher {
    pub fn new(engine: Arc<Engine>, tracker: Arc<ClaimTracker>) -> Self {
        Dispatcher {
            engine,
            tracker,
            workers: RwLock::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn tracker(&self) -> &Arc<ClaimTracker> {
        &self.tracker
    }

    /// Runs an accepted claim through validation and resolution, then hands
    /// it to its target's worker.
    ///
    /// Early rejections (malformed claim, unresolvable target) terminate
    /// here: the tracking entry is completed and any callback fired without
    /// a worker ever seeing the claim.
    #[instrument(skip_all, fields(claim_id = %claim_id))]
    pub async fn submit(
        &self,
        claim_id: ClaimId,
        source: &str,
        target: &str,
        callback: Option<Url>,
    ) {
        let claim = match Claim::parse(source, target) {
            Ok(claim) => claim,
            Err(err) => {
                info!(%err, "claim rejected before resolution");
                let outcome = ProtocolOutcome::rejected(RejectReason::BadRequest).to_wire();
                self.finish(&claim_id, outcome, callback.as_ref()).await;
                return;
            }
        };

        let mut cache = FetchCache::new();
        let resolution = match self.engine.resolve(&mut cache, &claim).await {
            Ok(resolution) => resolution,
            Err(fault) => {
                let outcome = wire(&Err(fault));
                self.finish(&claim_id, outcome, callback.as_ref()).await;
                return;
            }
        };

        let key = match resolution.key() {
            Some(key) => key,
            None => {
                let outcome = ProtocolOutcome::rejected(RejectReason::UnknownTarget).to_wire();
                self.finish(&claim_id, outcome, callback.as_ref()).await;
                return;
            }
        };

        let tx = self.get_or_spawn_worker(key).await;
        let message = WorkerMessage::Claim {
            claim_id: claim_id.clone(),
            claim,
            resolution,
            cache,
            callback: callback.clone(),
        };
        if tx.send(message).await.is_err() {
            // Worker channel closed mid-shutdown; the claim stays pending
            // until the process exits.
            debug!(target = %key, "worker channel closed, claim dropped");
        }
    }

    async fn finish(&self, claim_id: &ClaimId, outcome: WireOutcome, callback: Option<&Url>) {
        self.tracker.complete(claim_id, outcome.clone()).await;
        if let Some(callback) = callback {
            self.engine.deliver_callback(callback, &outcome).await;
        }
    }

    /// Gets an existing worker's sender or spawns a new worker task.
    async fn get_or_spawn_worker(&self, key: TargetKey) -> mpsc::Sender<WorkerMessage> {
        {
            let workers = self.workers.read().await;
            if let Some(handle) = workers.get(&key) {
                return handle.tx.clone();
            }
        }

        let mut workers = self.workers.write().await;

        // Double-check after acquiring the write lock.
        if let Some(handle) = workers.get(&key) {
            return handle.tx.clone();
        }

        debug!(target = %key, "spawning worker");
        let (tx, rx) = mpsc::channel(WORKER_CHANNEL_BUFFER);
        let cancel = self.shutdown.child_token();
        let worker = TargetWorker::new(key, self.engine.clone(), self.tracker.clone());
        let task = tokio::spawn(worker.run(rx, cancel));

        workers.insert(
            key,
            WorkerHandle {
                tx: tx.clone(),
                task,
            },
        );
        tx
    }

    /// Number of live workers.
    pub async fn worker_count(&self) -> usize {
        self.workers.read().await.len()
    }

    /// Signals every worker to finish its current claim and exit.
    pub async fn shutdown_all(&self) {
        info!("shutting down all workers");
        self.shutdown.cancel();

        let workers = self.workers.read().await;
        for (key, handle) in workers.iter() {
            trace!(target = %key, "sending shutdown to worker");
            let _ = handle.tx.send(WorkerMessage::Shutdown).await;
        }
    }
}
