//! Per-target worker system for claim processing.
//!
//! Each resolved target gets a dedicated worker that processes its claims
//! serially, so reconcile-then-persist is atomic per target while distinct
//! targets run concurrently. The dispatcher performs the read-only stages
//! (validation, resolution) before routing, so early rejections never
//! occupy a worker.

mod dispatch;
mod message;
mod tracking;
mod worker;

pub use dispatch::Dispatcher;
pub use message::WorkerMessage;
pub use tracking::{ClaimStatus, ClaimTracker};
pub use worker::TargetWorker;
