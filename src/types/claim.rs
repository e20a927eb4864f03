//! The inbound claim: one `(source, target)` pair as delivered.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;

/// Why a raw claim could not be turned into a [`Claim`].
///
/// Every variant surfaces to the sender as the `BadRequest` rejection; the
/// distinction exists for logging.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClaimError {
    /// One of the URLs failed to parse as an absolute URL.
    #[error("invalid {field} URL: {reason}")]
    InvalidUrl {
        field: &'static str,
        reason: String,
    },

    /// A URL used a scheme other than http/https.
    #[error("unsupported scheme in {field} URL: {scheme}")]
    UnsupportedScheme {
        field: &'static str,
        scheme: String,
    },

    /// Source and target are the same URL; a claim cannot reference itself.
    #[error("source and target are identical")]
    SelfReference,
}

/// An inbound Webmention claim.
///
/// Ephemeral: exists only for the duration of one processing attempt. Both
/// fields are syntactically valid absolute http(s) URLs and are known to
/// differ from each other; no other validation has happened yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub source: Url,
    pub target: Url,
}

impl Claim {
    /// Parses raw form-field strings into a claim.
    ///
    /// Rejects unparseable URLs, non-http(s) schemes, and self-referential
    /// claims (`source == target` after parsing).
    pub fn parse(source: &str, target: &str) -> Result<Claim, ClaimError> {
        let source = parse_field("source", source)?;
        let target = parse_field("target", target)?;

        if source == target {
            return Err(ClaimError::SelfReference);
        }

        Ok(Claim { source, target })
    }
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

fn parse_field(field: &'static str, raw: &str) -> Result<Url, ClaimError> {
    let url = Url::parse(raw).map_err(|e| ClaimError::InvalidUrl {
        field,
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ClaimError::UnsupportedScheme {
            field,
            scheme: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_pair() {
        let claim = Claim::parse("https://a.example/post/1", "https://b.example/note/2").unwrap();
        assert_eq!(claim.source.as_str(), "https://a.example/post/1");
        assert_eq!(claim.target.as_str(), "https://b.example/note/2");
    }

    #[test]
    fn rejects_self_reference() {
        let err = Claim::parse("https://a.example/x", "https://a.example/x").unwrap_err();
        assert_eq!(err, ClaimError::SelfReference);
    }

    #[test]
    fn rejects_garbage_source() {
        let err = Claim::parse("not a url", "https://b.example/").unwrap_err();
        assert!(matches!(err, ClaimError::InvalidUrl { field: "source", .. }));
    }

    #[test]
    fn rejects_relative_target() {
        let err = Claim::parse("https://a.example/", "/note/2").unwrap_err();
        assert!(matches!(err, ClaimError::InvalidUrl { field: "target", .. }));
    }

    #[test]
    fn rejects_non_http_scheme() {
        let err = Claim::parse("ftp://a.example/x", "https://b.example/").unwrap_err();
        assert!(matches!(
            err,
            ClaimError::UnsupportedScheme { field: "source", .. }
        ));
    }

    #[test]
    fn scheme_difference_is_not_self_reference() {
        // http vs https source/target are distinct URLs at this stage;
        // scheme-insensitive matching applies to alias checks, not here.
        let claim = Claim::parse("http://a.example/x", "https://a.example/x").unwrap();
        assert_ne!(claim.source, claim.target);
    }
}
