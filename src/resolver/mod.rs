//! Target endpoint resolution.
//!
//! Maps a claimed target URL onto a [`TargetResolution`]: a known post (with
//! its full alias set), the domain itself, or nothing. Resolution is
//! read-only and scheme-insensitive; `http://` and `https://` forms of the
//! same path resolve identically.
//!
//! Short permalinks on the live site answer with an HTTP redirect to the
//! canonical form, so targets that match no local shape are probed with
//! non-following GETs and each hop is re-examined, bounded by the configured
//! redirect budget.

use tracing::{debug, warn};
use url::Url;

use crate::config::{FetchConfig, SiteConfig};
use crate::fetch::{FetchCache, HttpRequest, HttpTransport};
use crate::store::{Post, PostStore, StoreError};
use crate::types::{TargetResolution, UnresolvedReason};

pub mod routes;

pub use routes::{match_route, RouteMatch};

/// Resolves claimed targets against the site's routes and post store.
#[derive(Clone)]
pub struct TargetResolver {
    site: SiteConfig,
    fetch: FetchConfig,
}

impl TargetResolver {
    pub fn new(site: SiteConfig, fetch: FetchConfig) -> Self {
        TargetResolver { site, fetch }
    }

    /// Resolves `target` to a post, the domain, or an unresolved reason.
    ///
    /// Local conclusions (root path, matched route) short-circuit without
    /// network traffic. Otherwise the URL is probed for redirects through
    /// `cache`, up to the configured hop budget, with loop detection.
    pub async fn resolve(
        &self,
        transport: &dyn HttpTransport,
        cache: &mut FetchCache,
        posts: &dyn PostStore,
        target: &Url,
    ) -> Result<TargetResolution, StoreError> {
        let mut current = target.clone();
        let mut visited: Vec<Url> = Vec::new();

        for hop in 0..=self.fetch.max_redirects {
            if self.is_local(&current) {
                match self.resolve_local(posts, &current).await? {
                    Some(resolution) => return Ok(resolution),
                    None => {}
                }
            }

            if hop == self.fetch.max_redirects {
                break;
            }

            visited.push(current.clone());
            let response = match cache
                .get(transport, self.probe_request(current.clone()))
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    warn!(url = %current, error = %err, "redirect probe failed");
                    return Ok(unresolved(UnresolvedReason::NoRouteMatched));
                }
            };

            if !response.is_redirect() {
                return Ok(unresolved(UnresolvedReason::NoRouteMatched));
            }

            let next = match response
                .header("location")
                .and_then(|loc| current.join(loc).ok())
            {
                Some(next) => next,
                None => return Ok(unresolved(UnresolvedReason::NoRouteMatched)),
            };

            if visited.contains(&next) {
                debug!(url = %next, "redirect loop detected");
                return Ok(unresolved(UnresolvedReason::TooManyRedirects));
            }

            debug!(from = %current, to = %next, "following target redirect");
            current = next;
        }

        Ok(unresolved(UnresolvedReason::TooManyRedirects))
    }

    /// Attempts a purely local conclusion for a URL on this site.
    ///
    /// Returns `None` when the path matches no known shape, in which case
    /// the caller may still probe for redirects.
    async fn resolve_local(
        &self,
        posts: &dyn PostStore,
        url: &Url,
    ) -> Result<Option<TargetResolution>, StoreError> {
        let path = normalize_path(url.path());

        if path == "/" {
            return Ok(Some(TargetResolution::DomainMention));
        }

        if match_route(&path, &self.site).is_none() {
            return Ok(None);
        }

        match posts.find_by_path(&path).await? {
            Some(post) if post.gone => Ok(Some(unresolved(UnresolvedReason::PostGone))),
            Some(post) => Ok(Some(TargetResolution::KnownPost {
                post: post.id,
                aliases: self.alias_urls(&post),
            })),
            None => Ok(Some(unresolved(UnresolvedReason::PostNotFound))),
        }
    }

    /// Every absolute URL under which a post accepts mentions.
    fn alias_urls(&self, post: &Post) -> Vec<Url> {
        post.alias_paths()
            .iter()
            .filter_map(|path| self.site.base_url.join(path).ok())
            .collect()
    }

    /// Same host as the site base, scheme ignored.
    fn is_local(&self, url: &Url) -> bool {
        url.host_str() == self.site.base_url.host_str()
    }

    fn probe_request(&self, url: Url) -> HttpRequest {
        HttpRequest {
            url,
            timeout: self.fetch.timeout,
            user_agent: self.fetch.user_agent.clone(),
            max_body_bytes: self.fetch.max_body_bytes,
            follow_redirects: false,
        }
    }
}

fn unresolved(reason: UnresolvedReason) -> TargetResolution {
    TargetResolution::Unresolved { reason }
}

/// Leading slash guaranteed, trailing slash dropped except at the root.
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
