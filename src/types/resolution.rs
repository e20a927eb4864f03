//! Target resolution: what a claimed target URL actually refers to.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use super::PostId;

/// Why a target failed to resolve.
///
/// All variants surface to the sender as the single `UnknownTarget` rejection;
/// the distinction exists for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// The path matched none of the known route shapes.
    NoRouteMatched,

    /// A route shape matched but no post exists there.
    PostNotFound,

    /// A route shape matched a post that was permanently removed.
    PostGone,

    /// Redirect following exceeded the hop bound or looped.
    TooManyRedirects,
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnresolvedReason::NoRouteMatched => "no route matched",
            UnresolvedReason::PostNotFound => "post not found",
            UnresolvedReason::PostGone => "post permanently removed",
            UnresolvedReason::TooManyRedirects => "too many redirects",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of resolving a claimed target URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetResolution {
    /// The target is a known post. `aliases` holds every URL under which the
    /// post accepts mentions: canonical permalink, slug-less and short
    /// permalinks, and any historical permalinks.
    KnownPost { post: PostId, aliases: Vec<Url> },

    /// The target is the site root / domain-level identity.
    DomainMention,

    /// The target maps to nothing known.
    Unresolved { reason: UnresolvedReason },
}

impl TargetResolution {
    /// The routing key under which claims for this target are serialized.
    ///
    /// `None` for unresolved targets, which never reach reconciliation.
    pub fn key(&self) -> Option<TargetKey> {
        match self {
            TargetResolution::KnownPost { post, .. } => Some(TargetKey::Post(*post)),
            TargetResolution::DomainMention => Some(TargetKey::Domain),
            TargetResolution::Unresolved { .. } => None,
        }
    }
}

/// Routing key for per-target worker serialization and mention storage.
///
/// Two claims with the same key must never reconcile concurrently; claims
/// with different keys are fully independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetKey {
    Post(PostId),
    Domain,
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKey::Post(id) => write!(f, "{}", id),
            TargetKey::Domain => write!(f, "domain"),
        }
    }
}
