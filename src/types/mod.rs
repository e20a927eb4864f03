//! Core domain types for the Webmention engine.

pub mod claim;
pub mod ids;
pub mod mention;
pub mod resolution;

pub use claim::{Claim, ClaimError};
pub use ids::{ClaimId, MentionId, PostId};
pub use mention::{MentionCandidate, PersistedMention, ReconcileResult, RefType};
pub use resolution::{TargetKey, TargetResolution, UnresolvedReason};
