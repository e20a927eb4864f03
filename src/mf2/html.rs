//! Built-in microformats scanner.
//!
//! A conservative single-pass class-attribute scanner covering the common
//! `h-entry` shapes: relationship anchors (`u-in-reply-to` etc.), `p-name`,
//! `e-content`, `dt-published`, `u-url`, `u-syndication`, nested
//! `p-author h-card` and `p-comment h-cite` items, and a page-level `h-card`.
//!
//! This is explicitly NOT a conforming microformats2 parser. It does not
//! implement implied properties, value-class patterns, or the full parsing
//! algorithm. Deployments that need those implement [`MarkupParser`] over a
//! real parser; tests construct [`Mf2Tree`]s directly.

use async_trait::async_trait;
use url::Url;

use super::node::{Mf2Tree, MicroformatNode, Value};
use super::MarkupParser;

/// The built-in scanner. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassScanParser;

#[async_trait]
impl MarkupParser for ClassScanParser {
    async fn parse(&self, html: &str, base_url: &Url) -> Mf2Tree {
        scan_document(html, base_url)
    }
}

/// Elements that never have content and never carry a close tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Debug)]
struct Tag<'a> {
    name: String,
    /// Attribute (name, value) pairs, names lowercased.
    attrs: Vec<(String, String)>,
    /// Byte offset just past the closing `>`.
    end: usize,
    is_close: bool,
    self_closing: bool,
    raw: &'a str,
}

impl Tag<'_> {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn classes(&self) -> Vec<&str> {
        self.attr("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.name.as_str())
    }
}

fn scan_document(html: &str, base: &Url) -> Mf2Tree {
    let mut items = Vec::new();
    let mut idx = 0;

    while let Some(tag) = next_tag(html, idx) {
        idx = tag.end;
        if tag.is_close {
            continue;
        }
        let h_types: Vec<String> = tag
            .classes()
            .iter()
            .filter(|c| c.starts_with("h-"))
            .map(|c| c.to_string())
            .collect();
        if h_types.is_empty() {
            continue;
        }

        let (inner, after) = element_inner(html, &tag);
        items.push(scan_node(inner, base, h_types));
        idx = after;
    }

    Mf2Tree::new(items)
}

/// Scans the inside of one microformat element into a node.
fn scan_node(fragment: &str, base: &Url, types: Vec<String>) -> MicroformatNode {
    let mut node = MicroformatNode {
        types,
        ..Default::default()
    };

    let mut idx = 0;
    while let Some(tag) = next_tag(fragment, idx) {
        idx = tag.end;
        if tag.is_close {
            continue;
        }

        let classes = tag.classes();
        let h_types: Vec<String> = classes
            .iter()
            .filter(|c| c.starts_with("h-"))
            .map(|c| c.to_string())
            .collect();
        let props: Vec<&str> = classes
            .iter()
            .copied()
            .filter(|c| {
                c.starts_with("p-") || c.starts_with("u-") || c.starts_with("dt-")
                    || c.starts_with("e-")
            })
            .collect();

        // A typed element with no property class is a plain child.
        if props.is_empty() {
            if !h_types.is_empty() {
                let (inner, after) = element_inner(fragment, &tag);
                node.children.push(scan_node(inner, base, h_types));
                idx = after;
            }
            continue;
        }

        for class in props {
            let (prefix, name) = class.split_at(class.find('-').unwrap_or(0) + 1);
            match prefix {
                "u-" => {
                    let raw = match tag.name.as_str() {
                        "a" | "link" | "area" => tag.attr("href"),
                        "img" | "audio" | "video" | "source" => tag.attr("src"),
                        _ => None,
                    };
                    let value = match raw {
                        Some(r) => resolve(base, r),
                        None => {
                            let (inner, after) = element_inner(fragment, &tag);
                            idx = after;
                            resolve(base, strip_tags(inner).trim())
                        }
                    };
                    if !value.is_empty() {
                        node.push_property(name, Value::text(value));
                    }
                }
                "dt-" => {
                    let value = match tag.attr("datetime") {
                        Some(dt) => dt.to_string(),
                        None => {
                            let (inner, after) = element_inner(fragment, &tag);
                            idx = after;
                            strip_tags(inner).trim().to_string()
                        }
                    };
                    if !value.is_empty() {
                        node.push_property(name, Value::text(value));
                    }
                }
                "e-" => {
                    let (inner, after) = element_inner(fragment, &tag);
                    idx = after;
                    node.push_property(
                        name,
                        Value::rich(inner.trim().to_string(), strip_tags(inner)),
                    );
                }
                "p-" => {
                    if !h_types.is_empty() {
                        // Nested item used as a property value (p-author h-card,
                        // p-comment h-cite).
                        let (inner, after) = element_inner(fragment, &tag);
                        idx = after;
                        node.push_property(
                            name,
                            Value::node(scan_node(inner, base, h_types.clone())),
                        );
                    } else if tag.name == "img" {
                        if let Some(alt) = tag.attr("alt") {
                            node.push_property(name, Value::text(alt));
                        }
                    } else {
                        let (inner, after) = element_inner(fragment, &tag);
                        idx = after;
                        let text = strip_tags(inner);
                        if !text.is_empty() {
                            node.push_property(name, Value::text(text));
                        }
                    }
                }
                _ => unreachable!("filtered to known prefixes"),
            }
        }
    }

    node
}

fn resolve(base: &Url, raw: &str) -> String {
    match base.join(raw) {
        Ok(url) => url.to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Finds the next tag at or after `from`. Skips comments and declarations.
fn next_tag(html: &str, from: usize) -> Option<Tag<'_>> {
    let mut pos = from;
    loop {
        let lt = pos + html[pos..].find('<')?;
        let rest = &html[lt..];

        if rest.starts_with("<!--") {
            pos = match html[lt..].find("-->") {
                Some(i) => lt + i + 3,
                None => return None,
            };
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            pos = lt + html[lt..].find('>')? + 1;
            continue;
        }

        let gt = lt + html[lt..].find('>')?;
        let body = &html[lt + 1..gt];
        let (is_close, body) = match body.strip_prefix('/') {
            Some(b) => (true, b),
            None => (false, body),
        };
        let (body, self_closing) = match body.strip_suffix('/') {
            Some(b) => (b, true),
            None => (body, false),
        };

        let name_end = body
            .find(|c: char| c.is_whitespace())
            .unwrap_or(body.len());
        let name = body[..name_end].to_ascii_lowercase();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
            pos = gt + 1;
            continue;
        }

        let attrs = if is_close {
            Vec::new()
        } else {
            parse_attrs(&body[name_end..])
        };

        return Some(Tag {
            name,
            attrs,
            end: gt + 1,
            is_close,
            self_closing,
            raw: &html[lt..gt + 1],
        });
    }
}

fn parse_attrs(mut s: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    loop {
        s = s.trim_start();
        if s.is_empty() {
            break;
        }
        let name_end = s
            .find(|c: char| c.is_whitespace() || c == '=')
            .unwrap_or(s.len());
        let name = s[..name_end].trim_end_matches('/').to_ascii_lowercase();
        s = s[name_end..].trim_start();

        let value = if let Some(rest) = s.strip_prefix('=') {
            let rest = rest.trim_start();
            if let Some(q) = rest.strip_prefix('"') {
                let end = q.find('"').unwrap_or(q.len());
                s = &q[(end + 1).min(q.len())..];
                decode_entities(&q[..end])
            } else if let Some(q) = rest.strip_prefix('\'') {
                let end = q.find('\'').unwrap_or(q.len());
                s = &q[(end + 1).min(q.len())..];
                decode_entities(&q[..end])
            } else {
                let end = rest
                    .find(|c: char| c.is_whitespace())
                    .unwrap_or(rest.len());
                s = &rest[end..];
                decode_entities(&rest[..end])
            }
        } else {
            String::new()
        };

        if !name.is_empty() {
            attrs.push((name, value));
        }
    }
    attrs
}

/// Returns the inner fragment of an element and the offset just past its
/// close tag, tracking nesting of the same tag name. Unclosed elements run to
/// the end of the fragment.
fn element_inner<'a>(html: &'a str, open: &Tag<'_>) -> (&'a str, usize) {
    if open.self_closing || open.is_void() {
        return (&html[open.end..open.end], open.end);
    }

    let mut depth = 1usize;
    let mut idx = open.end;
    while let Some(tag) = next_tag(html, idx) {
        let tag_start = tag.end - tag.raw.len();
        if tag.name == open.name {
            if tag.is_close {
                depth -= 1;
                if depth == 0 {
                    return (&html[open.end..tag_start], tag.end);
                }
            } else if !tag.self_closing && !tag.is_void() {
                depth += 1;
            }
        }
        idx = tag.end;
    }
    (&html[open.end..], html.len())
}

/// Strips markup, decodes common entities, and collapses whitespace.
pub fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut idx = 0;
    while idx < html.len() {
        match html[idx..].find('<') {
            Some(lt) => {
                out.push_str(&html[idx..idx + lt]);
                let after = idx + lt;
                match html[after..].find('>') {
                    Some(gt) => idx = after + gt + 1,
                    None => break,
                }
            }
            None => {
                out.push_str(&html[idx..]);
                break;
            }
        }
    }
    let decoded = decode_entities(&out);
    let collapsed: Vec<&str> = decoded.split_whitespace().collect();
    collapsed.join(" ")
}

fn decode_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://foreign.example/post/1").unwrap()
    }

    fn parse(html: &str) -> Mf2Tree {
        scan_document(html, &base())
    }

    #[test]
    fn empty_document_yields_empty_tree() {
        assert!(parse("<html><body><p>hello</p></body></html>").is_empty());
    }

    #[test]
    fn reply_entry_with_content_and_published() {
        let html = r#"
            <article class="h-entry">
              <a class="u-in-reply-to" href="https://example.com/note/2020/01/05/a1">in reply to</a>
              <div class="e-content"><p>Nice post!</p></div>
              <time class="dt-published" datetime="2020-01-06T10:00:00Z">Jan 6</time>
            </article>"#;
        let tree = parse(html);
        let entry = tree.find_entry().unwrap();

        assert_eq!(
            entry.property_urls("in-reply-to"),
            vec!["https://example.com/note/2020/01/05/a1"]
        );
        assert_eq!(entry.first_text("published"), Some("2020-01-06T10:00:00Z"));
        match &entry.property("content")[0] {
            Value::Rich { html, text } => {
                assert_eq!(text, "Nice post!");
                assert!(html.contains("<p>Nice post!</p>"));
            }
            other => panic!("expected rich content, got {:?}", other),
        }
    }

    #[test]
    fn relative_urls_resolve_against_base() {
        let html = r#"<div class="h-entry"><a class="u-url" href="/post/1"></a></div>"#;
        let tree = parse(html);
        let entry = tree.find_entry().unwrap();
        assert_eq!(
            entry.property_urls("url"),
            vec!["https://foreign.example/post/1"]
        );
    }

    #[test]
    fn nested_author_card() {
        let html = r#"
            <div class="h-entry">
              <div class="p-author h-card">
                <img class="u-photo" src="/me.jpg" alt="">
                <a class="p-name u-url" href="https://foreign.example/">Alex</a>
              </div>
            </div>"#;
        let tree = parse(html);
        let author = tree.find_entry().unwrap().first_node("author").unwrap();
        assert!(author.has_type("h-card"));
        assert_eq!(author.first_text("name"), Some("Alex"));
        assert_eq!(author.property_urls("url"), vec!["https://foreign.example/"]);
        assert_eq!(
            author.property_urls("photo"),
            vec!["https://foreign.example/me.jpg"]
        );
    }

    #[test]
    fn comment_cites_become_property_nodes() {
        let html = r#"
            <div class="h-entry">
              <a class="u-in-reply-to" href="https://t.example/x">re</a>
              <div class="p-comment h-cite">
                <a class="u-url" href="https://c.example/1">c1</a>
                <p class="p-content">first!</p>
              </div>
            </div>"#;
        let tree = parse(html);
        let entry = tree.find_entry().unwrap();
        let comment = entry.first_node("comment").unwrap();
        assert!(comment.has_type("h-cite"));
        assert_eq!(comment.property_urls("url"), vec!["https://c.example/1"]);
        assert_eq!(comment.first_text("content"), Some("first!"));
    }

    #[test]
    fn page_level_card_is_separate_item() {
        let html = r#"
            <div class="h-card"><span class="p-name">Site Owner</span></div>
            <div class="h-entry"><div class="e-content">hi</div></div>"#;
        let tree = parse(html);
        assert_eq!(tree.items.len(), 2);
        assert_eq!(tree.find_card().unwrap().first_text("name"), Some("Site Owner"));
        assert!(tree.find_entry().is_some());
    }

    #[test]
    fn multi_class_anchor_reports_both_relationships() {
        let html = r#"
            <div class="h-entry">
              <a class="u-like-of u-repost-of" href="https://t.example/x">both</a>
            </div>"#;
        let tree = parse(html);
        let entry = tree.find_entry().unwrap();
        assert_eq!(entry.property_urls("like-of"), vec!["https://t.example/x"]);
        assert_eq!(entry.property_urls("repost-of"), vec!["https://t.example/x"]);
    }

    #[test]
    fn strip_tags_decodes_and_collapses() {
        assert_eq!(
            strip_tags("<p>a &amp; b</p>\n   <span>c</span>"),
            "a & b c"
        );
    }

    #[test]
    fn comments_and_doctype_are_skipped() {
        let html = "<!DOCTYPE html><!-- <div class=\"h-entry\"> --><p>x</p>";
        assert!(parse(html).is_empty());
    }

    #[test]
    fn unclosed_entry_runs_to_end() {
        let html = r#"<div class="h-entry"><p class="p-name">title"#;
        let tree = parse(html);
        assert_eq!(tree.find_entry().unwrap().first_text("name"), Some("title"));
    }
}
