//! Mention records: the interpreter's candidates and their persisted form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use super::MentionId;

/// The semantic relationship a mention bears to its target.
///
/// Exactly one primary type per candidate. An explicit relationship assertion
/// in the source markup wins over a plain hyperlink; a plain hyperlink with no
/// assertion is a `Reference`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefType {
    Reply,
    Like,
    Repost,
    Bookmark,
    Reference,
}

impl fmt::Display for RefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RefType::Reply => "reply",
            RefType::Like => "like",
            RefType::Repost => "repost",
            RefType::Bookmark => "bookmark",
            RefType::Reference => "reference",
        };
        write!(f, "{}", s)
    }
}

/// One interpreted mention, as produced by the markup interpreter.
///
/// `source_url` is the identity key: it is the URL that was actually delivered
/// (or, for downstream comments, the comment's own URL) and stays stable even
/// when the self-reported `permalink` changes between deliveries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionCandidate {
    /// The delivered claim source (or a downstream comment's own URL).
    pub source_url: Url,

    /// The source's self-reported permalink (`u-url`), falling back to
    /// `source_url` when the entry declares none.
    pub permalink: Url,

    pub reftype: RefType,

    pub author_name: Option<String>,
    pub author_url: Option<Url>,
    pub author_image: Option<Url>,

    pub content_html: Option<String>,
    pub content_plain: Option<String>,
    pub title: Option<String>,

    /// Publish timestamp. When the source asserts none this is the reception
    /// time and `published_asserted` is false, so downstream ordering can
    /// distinguish asserted dates from fallbacks.
    pub published_at: DateTime<Utc>,
    pub published_asserted: bool,

    /// Syndication copies of the source, in document order.
    pub syndication: Vec<Url>,
}

impl MentionCandidate {
    /// A minimal candidate with everything optional absent.
    ///
    /// Used by the interpreter as the starting point before the extraction
    /// fallback chains fill in fields, and by tests.
    pub fn bare(source_url: Url, reftype: RefType, received_at: DateTime<Utc>) -> Self {
        MentionCandidate {
            permalink: source_url.clone(),
            source_url,
            reftype,
            author_name: None,
            author_url: None,
            author_image: None,
            content_html: None,
            content_plain: None,
            title: None,
            published_at: received_at,
            published_asserted: false,
            syndication: Vec::new(),
        }
    }
}

/// The stored form a candidate becomes after reconciliation.
///
/// Never physically removed: deletion flips `deleted` and keeps the record,
/// so a re-delivery after a 410 can observe (and reverse) the tombstone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedMention {
    pub id: MentionId,
    #[serde(flatten)]
    pub candidate: MentionCandidate,
    pub deleted: bool,
}

/// The reconciliation engine's verdict for one batch of candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileResult {
    pub to_create: Vec<MentionCandidate>,
    pub to_update: Vec<(MentionId, MentionCandidate)>,
    pub to_mark_deleted: Vec<MentionId>,
}

impl ReconcileResult {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_mark_deleted.is_empty()
    }

    /// Counts as reported in a successful protocol outcome.
    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.to_create.len(),
            self.to_update.len(),
            self.to_mark_deleted.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn reftype_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&RefType::Reply).unwrap(), "\"reply\"");
        assert_eq!(
            serde_json::to_string(&RefType::Bookmark).unwrap(),
            "\"bookmark\""
        );
    }

    #[test]
    fn bare_candidate_defaults() {
        let now = Utc::now();
        let c = MentionCandidate::bare(url("https://s.example/p"), RefType::Reference, now);
        assert_eq!(c.permalink, c.source_url);
        assert_eq!(c.published_at, now);
        assert!(!c.published_asserted);
        assert!(c.author_name.is_none());
        assert!(c.syndication.is_empty());
    }

    #[test]
    fn persisted_mention_flattens_candidate() {
        let c = MentionCandidate::bare(url("https://s.example/p"), RefType::Like, Utc::now());
        let m = PersistedMention {
            id: MentionId(9),
            candidate: c,
            deleted: false,
        };
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["id"], 9);
        assert_eq!(json["reftype"], "like");
        assert_eq!(json["deleted"], false);
    }

    #[test]
    fn reconcile_result_counts() {
        let c = MentionCandidate::bare(url("https://s.example/p"), RefType::Reply, Utc::now());
        let r = ReconcileResult {
            to_create: vec![c.clone()],
            to_update: vec![(MentionId(1), c)],
            to_mark_deleted: vec![MentionId(2), MentionId(3)],
        };
        assert_eq!(r.counts(), (1, 1, 2));
        assert!(!r.is_empty());
        assert!(ReconcileResult::default().is_empty());
    }
}
