//! Engine configuration.
//!
//! All tunables live here with the reference defaults: a 2 MiB source size
//! ceiling, a 30 second fetch timeout, and a 5-hop redirect bound.

use std::time::Duration;
use url::Url;

/// Where downstream (nested) comments attach.
///
/// Whether a comment discovered inside a first-order reply belongs to the
/// root post or to its immediate parent is genuinely site-dependent, so it
/// is a configuration switch rather than a guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttachPolicy {
    /// Lift every downstream comment onto the originally targeted post.
    #[default]
    RootPost,

    /// Attach downstream comments to the first-order comment they reply to.
    ParentComment,
}

/// The site whose posts receive mentions.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Root URL of the site. A target resolving to this path is a
    /// domain-level mention.
    pub base_url: Url,

    /// Post kinds that appear as the first segment of canonical permalinks,
    /// e.g. `note` in `/note/2020/01/05/a1`.
    pub post_kinds: Vec<String>,

    /// First segments of short permalinks, e.g. `n` in `/n/Ab3x`.
    pub short_prefixes: Vec<String>,
}

impl SiteConfig {
    pub fn new(base_url: Url) -> Self {
        SiteConfig {
            base_url,
            post_kinds: ["note", "article", "photo", "bookmark"]
                .map(String::from)
                .to_vec(),
            short_prefixes: ["n", "a", "p", "b"].map(String::from).to_vec(),
        }
    }

    pub fn with_post_kinds(mut self, kinds: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.post_kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_short_prefixes(
        mut self,
        prefixes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.short_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }
}

/// Guards applied when fetching source documents.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Ceiling on source document size. Sources declaring (or streaming) more
    /// than this are rejected without interpretation.
    pub max_body_bytes: usize,

    /// Per-request timeout for the source GET.
    pub timeout: Duration,

    /// Descriptive User-Agent sent on outbound requests.
    pub user_agent: String,

    /// Redirect hop bound for target resolution.
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            max_body_bytes: 2 * 1024 * 1024,
            timeout: Duration::from_secs(30),
            user_agent: "webmention-engine (https://example.com/webmention)".to_string(),
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    pub fn with_max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    pub fn with_max_redirects(mut self, hops: usize) -> Self {
        self.max_redirects = hops;
        self
    }
}

/// Interpretation tunables.
#[derive(Debug, Clone)]
pub struct InterpretConfig {
    pub attach_policy: AttachPolicy,

    /// Maximum nesting depth for downstream comments. Depth 1 is the primary
    /// candidate; depth 2 covers its comment list.
    pub max_comment_depth: usize,
}

impl Default for InterpretConfig {
    fn default() -> Self {
        InterpretConfig {
            attach_policy: AttachPolicy::RootPost,
            max_comment_depth: 2,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub site: SiteConfig,
    pub fetch: FetchConfig,
    pub interpret: InterpretConfig,
}

impl EngineConfig {
    pub fn new(base_url: Url) -> Self {
        EngineConfig {
            site: SiteConfig::new(base_url),
            fetch: FetchConfig::default(),
            interpret: InterpretConfig::default(),
        }
    }

    pub fn with_fetch(mut self, fetch: FetchConfig) -> Self {
        self.fetch = fetch;
        self
    }

    pub fn with_attach_policy(mut self, policy: AttachPolicy) -> Self {
        self.interpret.attach_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_defaults_match_reference_system() {
        let cfg = FetchConfig::default();
        assert_eq!(cfg.max_body_bytes, 2 * 1024 * 1024);
        assert_eq!(cfg.timeout, Duration::from_secs(30));
        assert_eq!(cfg.max_redirects, 5);
    }

    #[test]
    fn attach_policy_defaults_to_root_post() {
        assert_eq!(InterpretConfig::default().attach_policy, AttachPolicy::RootPost);
    }

    #[test]
    fn builders_override() {
        let base = Url::parse("https://example.com/").unwrap();
        let cfg = EngineConfig::new(base)
            .with_fetch(FetchConfig::default().with_max_body_bytes(1024))
            .with_attach_policy(AttachPolicy::ParentComment);
        assert_eq!(cfg.fetch.max_body_bytes, 1024);
        assert_eq!(cfg.interpret.attach_policy, AttachPolicy::ParentComment);
    }

    #[test]
    fn site_config_custom_routes() {
        let base = Url::parse("https://example.com/").unwrap();
        let site = SiteConfig::new(base)
            .with_post_kinds(["essay"])
            .with_short_prefixes(["e"]);
        assert_eq!(site.post_kinds, vec!["essay"]);
        assert_eq!(site.short_prefixes, vec!["e"]);
    }
}
