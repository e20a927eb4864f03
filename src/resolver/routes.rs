//! Permalink route shapes.
//!
//! Pure matching of site-relative paths against the known permalink shapes,
//! in fixed precedence order. First match wins; the resolver then asks the
//! post store whether anything actually lives at the path.

use crate::config::SiteConfig;

/// A recognized route shape.
///
/// Variants are listed in matching precedence order: canonical dated-slug,
/// legacy dated, short-code, numeric id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMatch {
    /// `/{kind}/{yyyy}/{mm}/{dd}/{slug}` with a configured post kind.
    Canonical {
        kind: String,
        year: u16,
        month: u8,
        day: u8,
        slug: String,
    },

    /// `/{yyyy}/{mm}/{dd}/{slug}`, the historic shape before paths carried
    /// a kind segment.
    LegacyDated {
        year: u16,
        month: u8,
        day: u8,
        slug: String,
    },

    /// `/{prefix}/{code}` with a configured short prefix.
    Short { prefix: String, code: String },

    /// `/post/{n}`.
    NumericId { id: u64 },
}

/// Matches a path against the site's route shapes.
///
/// Returns `None` when no shape matches; the path may still be the site root,
/// which the resolver checks separately.
pub fn match_route(path: &str, site: &SiteConfig) -> Option<RouteMatch> {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    match segments.as_slice() {
        [kind, year, month, day, slug]
            if site.post_kinds.iter().any(|k| k == kind) && is_slug(slug) =>
        {
            Some(RouteMatch::Canonical {
                kind: kind.to_string(),
                year: parse_year(year)?,
                month: parse_two_digit(month, 1..=12)?,
                day: parse_two_digit(day, 1..=31)?,
                slug: slug.to_string(),
            })
        }
        [year, month, day, slug] if is_slug(slug) => Some(RouteMatch::LegacyDated {
            year: parse_year(year)?,
            month: parse_two_digit(month, 1..=12)?,
            day: parse_two_digit(day, 1..=31)?,
            slug: slug.to_string(),
        }),
        [prefix, code]
            if site.short_prefixes.iter().any(|p| p == prefix) && is_short_code(code) =>
        {
            Some(RouteMatch::Short {
                prefix: prefix.to_string(),
                code: code.to_string(),
            })
        }
        ["post", id] if id.chars().all(|c| c.is_ascii_digit()) && !id.is_empty() => {
            Some(RouteMatch::NumericId {
                id: id.parse().ok()?,
            })
        }
        _ => None,
    }
}

fn parse_year(s: &str) -> Option<u16> {
    if s.len() == 4 && s.chars().all(|c| c.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

fn parse_two_digit(s: &str, range: std::ops::RangeInclusive<u8>) -> Option<u8> {
    if s.len() == 2 && s.chars().all(|c| c.is_ascii_digit()) {
        s.parse().ok().filter(|n| range.contains(n))
    } else {
        None
    }
}

fn is_slug(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn is_short_code(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric())
}
