//! Newtype wrappers for domain identifiers.
//!
//! These types prevent accidental mixing of different ID types (e.g., using a
//! MentionId where a PostId is expected) and make the code more self-documenting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a post in the external post store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub u64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "post:{}", self.0)
    }
}

impl From<u64> for PostId {
    fn from(n: u64) -> Self {
        PostId(n)
    }
}

/// Identifier of a persisted mention.
///
/// Assigned by the mention store on first creation of a `(target, source_url)`
/// pair and stable across subsequent re-deliveries from the same source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MentionId(pub u64);

impl fmt::Display for MentionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mention:{}", self.0)
    }
}

impl From<u64> for MentionId {
    fn from(n: u64) -> Self {
        MentionId(n)
    }
}

/// Tracking handle for one accepted claim.
///
/// Minted by the acceptance endpoint before the claim is enqueued; the sender
/// can poll the status endpoint (or receive a callback) keyed by this value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimId(pub String);

impl ClaimId {
    pub fn new(s: impl Into<String>) -> Self {
        ClaimId(s.into())
    }

    /// Mints a fresh random claim ID.
    pub fn random() -> Self {
        ClaimId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ClaimId {
    fn from(s: String) -> Self {
        ClaimId(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod post_id {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn serde_roundtrip(n: u64) {
                let id = PostId(n);
                let json = serde_json::to_string(&id).unwrap();
                let parsed: PostId = serde_json::from_str(&json).unwrap();
                prop_assert_eq!(id, parsed);
            }

            #[test]
            fn comparison_matches_underlying(a: u64, b: u64) {
                prop_assert_eq!(PostId(a) == PostId(b), a == b);
            }
        }

        #[test]
        fn display_format() {
            assert_eq!(format!("{}", PostId(7)), "post:7");
        }
    }

    mod mention_id {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn serde_roundtrip(n: u64) {
                let id = MentionId(n);
                let json = serde_json::to_string(&id).unwrap();
                let parsed: MentionId = serde_json::from_str(&json).unwrap();
                prop_assert_eq!(id, parsed);
            }
        }
    }

    mod claim_id {
        use super::*;

        #[test]
        fn random_ids_are_distinct() {
            assert_ne!(ClaimId::random(), ClaimId::random());
        }

        #[test]
        fn serde_is_transparent() {
            let id = ClaimId::new("abc-123");
            assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc-123\"");
        }
    }
}
