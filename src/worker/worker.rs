//! The per-target event loop.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::protocol::{wire, Engine};
use crate::types::TargetKey;

use super::message::WorkerMessage;
use super::tracking::ClaimTracker;

/// Processes every claim for one target, strictly in arrival order.
pub struct TargetWorker {
    key: TargetKey,
    engine: Arc<Engine>,
    tracker: Arc<ClaimTracker>,
}

impl TargetWorker {
    pub fn new(key: TargetKey, engine: Arc<Engine>, tracker: Arc<ClaimTracker>) -> Self {
        TargetWorker {
            key,
            engine,
            tracker,
        }
    }

    /// The event loop. Exits on shutdown message, channel close, or
    /// cancellation; an in-flight claim always runs to completion first.
    #[instrument(skip_all, fields(target = %self.key))]
    pub async fn run(
        self,
        mut rx: mpsc::Receiver<WorkerMessage>,
        cancel: CancellationToken,
    ) {
        info!("worker started");
        loop {
            let message = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("worker cancelled");
                    break;
                }
                message = rx.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };

            match message {
                WorkerMessage::Claim {
                    claim_id,
                    claim,
                    resolution,
                    mut cache,
                    callback,
                } => {
                    debug!(%claim_id, source = %claim.source, "processing claim");
                    let result = self
                        .engine
                        .process_resolved(&claim, &resolution, &mut cache)
                        .await;
                    let outcome = wire(&result);
                    self.tracker.complete(&claim_id, outcome.clone()).await;
                    if let Some(callback) = callback {
                        self.engine.deliver_callback(&callback, &outcome).await;
                    }
                }
                WorkerMessage::Shutdown => {
                    debug!("worker shutting down");
                    break;
                }
            }
        }
        info!("worker stopped");
    }
}
