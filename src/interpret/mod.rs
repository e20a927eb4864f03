//! Markup interpretation.
//!
//! Pure functions from a parsed [`Mf2Tree`] to [`MentionCandidate`]s. The
//! interpreter never performs I/O: the orchestrator fetches and verifies, the
//! interpreter only reads the tree.
//!
//! Each relationship the entry asserts toward the target yields a candidate
//! of that type, emitted in detection order (reply, like, repost, bookmark);
//! they share the source URL, so reconciliation's last-write-wins collapses
//! them to one persisted mention. A verified link with no assertion becomes
//! a plain [`RefType::Reference`]. When a reply candidate carries downstream
//! comments they become further candidates, keyed by their own permalinks,
//! if the attach policy lifts them onto the root post.

use chrono::{DateTime, NaiveDate, Utc};
use url::Url;

use crate::config::{AttachPolicy, InterpretConfig};
use crate::mf2::{Mf2Tree, MicroformatNode, Value};
use crate::types::{MentionCandidate, RefType};
use crate::verify::matches_any_alias;

/// Relationship properties in detection order.
const RELATION_PROPERTIES: [(&str, RefType); 4] = [
    ("in-reply-to", RefType::Reply),
    ("like-of", RefType::Like),
    ("repost-of", RefType::Repost),
    ("bookmark-of", RefType::Bookmark),
];

/// Interprets a parsed source document against a verified target.
///
/// `aliases` is the full accepted alias set for the target; relationship
/// URLs are matched against it scheme-insensitively. Returns an empty list
/// when the tree carries no `h-entry`.
pub fn interpret(
    tree: &Mf2Tree,
    source_url: &Url,
    aliases: &[Url],
    received_at: DateTime<Utc>,
    config: &InterpretConfig,
) -> Vec<MentionCandidate> {
    let entry = match tree.find_entry() {
        Some(entry) => entry,
        None => return Vec::new(),
    };

    let asserted = asserted_reftypes(entry, source_url, aliases);
    let mut out: Vec<MentionCandidate> = if asserted.is_empty() {
        vec![extract_candidate(
            entry,
            tree,
            source_url,
            RefType::Reference,
            received_at,
        )]
    } else {
        asserted
            .into_iter()
            .map(|reftype| extract_candidate(entry, tree, source_url, reftype, received_at))
            .collect()
    };

    let is_reply = out.iter().any(|c| c.reftype == RefType::Reply);
    if is_reply
        && config.attach_policy == AttachPolicy::RootPost
        && config.max_comment_depth > 1
    {
        let parent_permalink = out[0].permalink.clone();
        collect_downstream(
            entry,
            &parent_permalink,
            received_at,
            2,
            config.max_comment_depth,
            &mut out,
        );
    }
    out
}

/// Every relationship the entry asserts toward any alias of the target, in
/// detection order.
fn asserted_reftypes(entry: &MicroformatNode, base: &Url, aliases: &[Url]) -> Vec<RefType> {
    RELATION_PROPERTIES
        .into_iter()
        .filter(|&(property, _)| {
            entry
                .property_urls(property)
                .iter()
                .filter_map(|raw| base.join(raw).ok())
                .any(|resolved| matches_any_alias(&resolved, aliases))
        })
        .map(|(_, reftype)| reftype)
        .collect()
}

/// Builds one candidate from an entry node, filling each field through its
/// fallback chain.
fn extract_candidate(
    entry: &MicroformatNode,
    page: &Mf2Tree,
    source_url: &Url,
    reftype: RefType,
    received_at: DateTime<Utc>,
) -> MentionCandidate {
    let mut candidate = MentionCandidate::bare(source_url.clone(), reftype, received_at);

    if let Some(permalink) = entry
        .first_text("url")
        .and_then(|raw| source_url.join(raw).ok())
    {
        candidate.permalink = permalink;
    }

    apply_author(&mut candidate, entry, page, source_url);
    apply_content(&mut candidate, entry);

    candidate.title = entry.first_text("name").map(str::to_string);

    if let Some(published) = entry.first_text("published").and_then(parse_published) {
        candidate.published_at = published;
        candidate.published_asserted = true;
    }

    candidate.syndication = entry
        .property_urls("syndication")
        .iter()
        .filter_map(|raw| source_url.join(raw).ok())
        .collect();

    candidate
}

/// Author fallback chain: embedded `h-card`, plain-text author, page-level
/// `h-card`.
fn apply_author(
    candidate: &mut MentionCandidate,
    entry: &MicroformatNode,
    page: &Mf2Tree,
    base: &Url,
) {
    if let Some(card) = entry.first_node("author") {
        fill_from_card(candidate, card, base);
        return;
    }

    if let Some(name) = entry.property("author").iter().find_map(Value::as_text) {
        candidate.author_name = Some(name.to_string());
        return;
    }

    if let Some(card) = page.find_card() {
        fill_from_card(candidate, card, base);
    }
}

fn fill_from_card(candidate: &mut MentionCandidate, card: &MicroformatNode, base: &Url) {
    candidate.author_name = card.first_text("name").map(str::to_string);
    candidate.author_url = card.first_text("url").and_then(|raw| base.join(raw).ok());
    candidate.author_image = card.first_text("photo").and_then(|raw| base.join(raw).ok());
}

/// Content fallback chain: `content` (rich or plain), then `summary`, then
/// plaintext gathered from the rest of the entry.
fn apply_content(candidate: &mut MentionCandidate, entry: &MicroformatNode) {
    match entry.property("content").first() {
        Some(Value::Rich { html, text }) => {
            candidate.content_html = Some(html.clone());
            candidate.content_plain = Some(text.clone());
        }
        Some(Value::Text { value }) => {
            candidate.content_plain = Some(value.clone());
        }
        _ => {
            candidate.content_plain = entry
                .first_text("summary")
                .map(str::to_string)
                .or_else(|| entry_fallback_text(entry));
        }
    }
}

/// Last-resort plaintext for an entry with neither `content` nor `summary`:
/// its name, else the concatenated text of its remaining prose properties.
fn entry_fallback_text(entry: &MicroformatNode) -> Option<String> {
    if let Some(name) = entry.first_text("name") {
        return Some(name.to_string());
    }
    let structural = |name: &str| {
        matches!(
            name,
            "url" | "published" | "updated" | "syndication" | "author" | "comment" | "photo"
        ) || RELATION_PROPERTIES.iter().any(|(p, _)| *p == name)
    };
    let pieces: Vec<&str> = entry
        .properties
        .iter()
        .filter(|(name, _)| !structural(name.as_str()))
        .flat_map(|(_, values)| values.iter().filter_map(Value::as_text))
        .collect();
    if pieces.is_empty() {
        None
    } else {
        Some(pieces.join(" "))
    }
}

/// Recurses into an entry's `comment` property, lifting nested cites into
/// candidates of their own.
///
/// A nested comment must carry its own URL to participate; without one it
/// has no stable identity and is skipped. Its type is whatever it asserts
/// toward the parent's permalink, defaulting to a reply since it arrived in
/// a comment list.
fn collect_downstream(
    entry: &MicroformatNode,
    parent_permalink: &Url,
    received_at: DateTime<Utc>,
    depth: usize,
    max_depth: usize,
    out: &mut Vec<MentionCandidate>,
) {
    if depth > max_depth {
        return;
    }

    // A nested comment's author must come from the cite itself; the claim
    // page's h-card describes a different site.
    let no_page = Mf2Tree::default();
    let parent_aliases = [parent_permalink.clone()];
    for value in entry.property("comment") {
        let node = match value.as_node() {
            Some(node) => node,
            None => continue,
        };
        let comment_url = match node
            .first_text("url")
            .and_then(|raw| parent_permalink.join(raw).ok())
        {
            Some(url) => url,
            None => continue,
        };

        let reftype = asserted_reftypes(node, &comment_url, &parent_aliases)
            .into_iter()
            .next()
            .unwrap_or(RefType::Reply);
        let candidate = extract_candidate(node, &no_page, &comment_url, reftype, received_at);
        let next_parent = candidate.permalink.clone();
        out.push(candidate);

        // Only replies carry a thread of their own to descend into.
        if reftype == RefType::Reply {
            collect_downstream(node, &next_parent, received_at, depth + 1, max_depth, out);
        }
    }
}

/// Parses an asserted publish timestamp.
///
/// RFC 3339 forms are taken as-is; a bare date is read as midnight UTC.
fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_hms_opt(0, 0, 0).unwrap().and_utc())
}
