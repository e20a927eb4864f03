//! Claim disposition: the outcome taxonomy and the state machine that
//! produces it.

pub mod machine;
pub mod outcome;


pub use machine::{wire, Engine, EngineFault};
pub use outcome::{ProtocolOutcome, RejectReason, WireOutcome};
