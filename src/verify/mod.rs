//! Link-back verification.
//!
//! Confirms that a source document actually links to one of the target's
//! accepted URL aliases. This is a plain attribute scan over `<a>` and
//! `<link>` tags, run before the semantic parse on purpose: it rejects spam
//! claims with no real linkage cheaply, without any markup interpretation.
//!
//! Also hosts the `http-equiv=status` meta scan the deletion path uses.

use url::Url;

use crate::fetch::SourceDocument;

/// Scheme-insensitive URL equality, ignoring fragments.
///
/// Sites are not guaranteed to mirror the target's scheme, so `http://` and
/// `https://` variants of an alias are interchangeable. Everything after the
/// scheme (host, port, path, query) must match exactly.
pub fn schemeless_eq(a: &Url, b: &Url) -> bool {
    fn tail(u: &Url) -> &str {
        let s = u.as_str();
        let s = s.split_once(':').map(|(_, rest)| rest).unwrap_or(s);
        s.split('#').next().unwrap_or(s)
    }
    tail(a) == tail(b)
}

/// Whether `url` matches any alias scheme-insensitively.
pub fn matches_any_alias(url: &Url, aliases: &[Url]) -> bool {
    aliases.iter().any(|alias| schemeless_eq(url, alias))
}

/// Scans the document for an `<a>` or `<link>` element whose resolved `href`
/// is one of the target's aliases.
pub fn verify_link_back(doc: &SourceDocument, aliases: &[Url]) -> bool {
    hrefs(&doc.body)
        .filter_map(|raw| doc.final_url.join(raw).ok())
        .any(|resolved| matches_any_alias(&resolved, aliases))
}

/// Extracts the numeric code from an `http-equiv=status` meta tag, if any.
///
/// Sources that cannot emit real HTTP status codes signal deletion with
/// `<meta http-equiv="Status" content="410 Gone">` in a 200 response.
pub fn meta_status(body: &str) -> Option<u16> {
    for tag in tags(body, "meta") {
        match attr_value(tag, "http-equiv") {
            Some(e) if e.eq_ignore_ascii_case("status") => {}
            _ => continue,
        }
        let Some(content) = attr_value(tag, "content") else {
            continue;
        };
        let digits: String = content
            .trim_start()
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if let Ok(code) = digits.parse() {
            return Some(code);
        }
    }
    None
}

/// Iterates over the raw `href` values of every `<a>` and `<link>` tag.
fn hrefs(body: &str) -> impl Iterator<Item = &str> {
    tags(body, "a")
        .chain(tags(body, "link"))
        .filter_map(|tag| attr_value(tag, "href"))
}

/// Iterates over the interiors of tags with the given name.
fn tags<'a>(body: &'a str, name: &'a str) -> impl Iterator<Item = &'a str> {
    let mut pos = 0;
    std::iter::from_fn(move || {
        while pos < body.len() {
            let lt = match body[pos..].find('<') {
                Some(i) => pos + i,
                None => return None,
            };
            let gt = match body[lt..].find('>') {
                Some(i) => lt + i,
                None => return None,
            };
            let interior = &body[lt + 1..gt];
            pos = gt + 1;

            let tag_name_len = interior
                .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
                .unwrap_or(interior.len());
            if interior[..tag_name_len].eq_ignore_ascii_case(name) {
                return Some(interior);
            }
        }
        None
    })
}

/// Pulls one attribute value out of a tag interior. Handles double-quoted,
/// single-quoted, and unquoted values.
fn attr_value<'a>(tag: &'a str, attr: &str) -> Option<&'a str> {
    let lower = tag.to_ascii_lowercase();
    let mut search = 0;
    loop {
        let at = search + lower[search..].find(&attr.to_ascii_lowercase())?;
        // Must be a standalone attribute name, not a substring of another.
        let before_ok = at == 0
            || lower.as_bytes()[at - 1].is_ascii_whitespace();
        let after = at + attr.len();
        let rest = lower[after..].trim_start();
        if !before_ok || !rest.starts_with('=') {
            search = at + 1;
            continue;
        }

        let value_start = after + (lower.len() - after - lower[after..].trim_start().len()) + 1;
        let value = tag[value_start..].trim_start();
        let offset = tag.len() - value.len();
        return match value.chars().next() {
            Some('"') => value[1..].find('"').map(|end| &tag[offset + 1..offset + 1 + end]),
            Some('\'') => value[1..].find('\'').map(|end| &tag[offset + 1..offset + 1 + end]),
            Some(_) => {
                let end = value
                    .find(|c: char| c.is_whitespace())
                    .unwrap_or(value.len());
                Some(&tag[offset..offset + end])
            }
            None => None,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn doc(body: &str) -> SourceDocument {
        SourceDocument {
            status: 200,
            content_type: Some("text/html".into()),
            content_length: None,
            body: body.to_string(),
            final_url: url("https://foreign.example/post/1"),
        }
    }

    fn aliases() -> Vec<Url> {
        vec![
            url("https://example.com/note/2020/01/05/a1"),
            url("https://example.com/n/Ab3x"),
        ]
    }

    mod matching {
        use super::*;
        use proptest::prelude::*;

        #[test]
        fn schemes_are_interchangeable() {
            assert!(schemeless_eq(
                &url("http://example.com/a"),
                &url("https://example.com/a")
            ));
        }

        #[test]
        fn fragments_are_ignored() {
            assert!(schemeless_eq(
                &url("https://example.com/a#section"),
                &url("https://example.com/a")
            ));
        }

        #[test]
        fn paths_must_match_exactly() {
            assert!(!schemeless_eq(
                &url("https://example.com/a"),
                &url("https://example.com/a/")
            ));
            assert!(!schemeless_eq(
                &url("https://example.com/a?x=1"),
                &url("https://example.com/a")
            ));
        }

        proptest! {
            #[test]
            fn schemeless_eq_is_reflexive_and_symmetric(
                path in "[a-z]{1,8}(/[a-z0-9]{1,8}){0,3}"
            ) {
                let https = url(&format!("https://example.com/{}", path));
                let http = url(&format!("http://example.com/{}", path));
                prop_assert!(schemeless_eq(&https, &https));
                prop_assert!(schemeless_eq(&https, &http));
                prop_assert!(schemeless_eq(&http, &https));
            }
        }
    }

    mod link_back {
        use super::*;

        #[test]
        fn finds_anchor_to_canonical_alias() {
            let d = doc(r#"<p>see <a href="https://example.com/note/2020/01/05/a1">this</a></p>"#);
            assert!(verify_link_back(&d, &aliases()));
        }

        #[test]
        fn finds_link_element() {
            let d = doc(r#"<link rel="in-reply-to" href="https://example.com/n/Ab3x">"#);
            assert!(verify_link_back(&d, &aliases()));
        }

        #[test]
        fn accepts_scheme_variant() {
            let d = doc(r#"<a href="http://example.com/n/Ab3x">short</a>"#);
            assert!(verify_link_back(&d, &aliases()));
        }

        #[test]
        fn resolves_relative_hrefs_against_final_url() {
            let d = SourceDocument {
                final_url: url("https://example.com/elsewhere/page"),
                ..doc(r#"<a href="/n/Ab3x">short</a>"#)
            };
            assert!(verify_link_back(&d, &aliases()));
        }

        #[test]
        fn no_link_means_no_verification() {
            let d = doc(r#"<a href="https://other.example/x">elsewhere</a>"#);
            assert!(!verify_link_back(&d, &aliases()));
        }

        #[test]
        fn mention_in_plain_text_does_not_count() {
            let d = doc("the page https://example.com/n/Ab3x is mentioned without a link");
            assert!(!verify_link_back(&d, &aliases()));
        }

        #[test]
        fn single_quoted_and_unquoted_hrefs() {
            assert!(verify_link_back(
                &doc(r#"<a href='https://example.com/n/Ab3x'>x</a>"#),
                &aliases()
            ));
            assert!(verify_link_back(
                &doc(r#"<a href=https://example.com/n/Ab3x>x</a>"#),
                &aliases()
            ));
        }
    }

    mod meta_status_scan {
        use super::*;

        #[test]
        fn finds_gone_marker() {
            let body = r#"<html><head><meta http-equiv="Status" content="410 Gone"></head></html>"#;
            assert_eq!(meta_status(body), Some(410));
        }

        #[test]
        fn case_insensitive_equiv() {
            let body = r#"<meta HTTP-EQUIV="status" content="410">"#;
            assert_eq!(meta_status(body), Some(410));
        }

        #[test]
        fn other_equivs_are_ignored() {
            let body = r#"<meta http-equiv="refresh" content="5">"#;
            assert_eq!(meta_status(body), None);
        }

        #[test]
        fn absent_meta_is_none() {
            assert_eq!(meta_status("<html><body>hi</body></html>"), None);
        }

        #[test]
        fn scan_continues_past_unrelated_meta_tags() {
            let body = r#"<meta charset="utf-8"><meta http-equiv="status" content="410 Gone">"#;
            assert_eq!(meta_status(body), Some(410));
        }
    }
}
