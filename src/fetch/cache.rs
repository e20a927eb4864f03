//! Per-claim response cache.
//!
//! An explicit object scoped to one claim's processing lifetime, never
//! shared across concurrent claims. The resolver's redirect probes and the
//! source fetch pass through the same cache, so a URL consulted during both
//! resolution and fetching is downloaded once.

use std::collections::HashMap;

use url::Url;

use super::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};

/// Cache key: the URL plus whether transport-level redirect following was on,
/// since the two modes can return different responses for the same URL.
type Key = (Url, bool);

/// Memoizes successful GETs for the duration of one claim.
#[derive(Debug, Default)]
pub struct FetchCache {
    entries: HashMap<Key, HttpResponse>,
}

impl FetchCache {
    pub fn new() -> Self {
        FetchCache {
            entries: HashMap::new(),
        }
    }

    /// Performs a GET through the cache. Errors are not cached; a retried URL
    /// hits the transport again.
    pub async fn get(
        &mut self,
        transport: &dyn HttpTransport,
        req: HttpRequest,
    ) -> Result<HttpResponse, TransportError> {
        let key = (req.url.clone(), req.follow_redirects);
        if let Some(hit) = self.entries.get(&key) {
            return Ok(hit.clone());
        }
        let response = transport.get(req).await?;
        self.entries.insert(key, response.clone());
        Ok(response)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
