//! Protocol outcomes and the wire shape they serialize to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a claim was rejected.
///
/// The full taxonomy of terminal rejections. A rejection is final for the
/// delivery that produced it; the sender is free to deliver again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Malformed or unsupported claim URLs, or source equal to target.
    BadRequest,

    /// The target resolves to nothing mentions can land on.
    UnknownTarget,

    /// The source could not be fetched, or answered with a non-2xx status
    /// other than 410.
    SourceUnreachable,

    /// The source body exceeds the configured ceiling.
    TooLarge,

    /// The source is not a text-like document.
    WrongContentType,

    /// The fetched source does not link to any alias of the target.
    NoLinkBack,

    /// The source links back but its markup yields no interpretable entry.
    NoMentionFound,
}

impl RejectReason {
    fn description(&self) -> &'static str {
        match self {
            RejectReason::BadRequest => "malformed source or target",
            RejectReason::UnknownTarget => "target is not a known page",
            RejectReason::SourceUnreachable => "source could not be fetched",
            RejectReason::TooLarge => "source document too large",
            RejectReason::WrongContentType => "source is not a text document",
            RejectReason::NoLinkBack => "source does not link to target",
            RejectReason::NoMentionFound => "no interpretable mention in source",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Terminal disposition of one processed claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProtocolOutcome {
    /// The claim changed (or confirmed) stored state. Deletion via 410 is a
    /// success with a nonzero `deleted` count; a replay that changes nothing
    /// reports all zeros.
    Success {
        created: usize,
        updated: usize,
        deleted: usize,
    },

    Rejected { reason: RejectReason },
}

/// The JSON contract exposed to status checks and sender callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireOutcome {
    pub response_code: u16,
    pub status: String,
    pub reason: String,
}

impl WireOutcome {
    /// An internal fault that is not part of the rejection taxonomy.
    pub fn internal(reason: impl Into<String>) -> Self {
        WireOutcome {
            response_code: 400,
            status: "error".to_string(),
            reason: reason.into(),
        }
    }
}

impl ProtocolOutcome {
    pub fn rejected(reason: RejectReason) -> Self {
        ProtocolOutcome::Rejected { reason }
    }

    pub fn to_wire(&self) -> WireOutcome {
        match self {
            ProtocolOutcome::Success {
                created,
                updated,
                deleted,
            } => WireOutcome {
                response_code: 200,
                status: "success".to_string(),
                reason: format!(
                    "created {}, updated {}, deleted {}",
                    created, updated, deleted
                ),
            },
            ProtocolOutcome::Rejected { reason } => WireOutcome {
                response_code: 400,
                status: "error".to_string(),
                reason: reason.to_string(),
            },
        }
    }
}
