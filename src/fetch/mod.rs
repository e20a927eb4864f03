//! Source document retrieval with size/type/timeout guards.

use thiserror::Error;
use url::Url;

use crate::config::FetchConfig;

pub mod cache;
pub mod transport;

pub use cache::FetchCache;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};

/// Why a source document could not be retrieved for interpretation.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection failure or timeout.
    #[error("network failure fetching source: {0}")]
    Network(String),

    /// Declared or streamed size exceeds the ceiling.
    #[error("source exceeds size ceiling ({limit} bytes)")]
    TooLarge { limit: usize },

    /// Declared MIME top-level type is not `text`.
    #[error("source content type is not text: {content_type}")]
    WrongContentType { content_type: String },
}

/// A fetched source representation.
///
/// Valid for interpretation only when `status` is 2xx; the guards in
/// [`SourceFetcher::fetch`] have already enforced the type and size
/// invariants for 2xx responses. Non-2xx documents carry meaningful status
/// (410 feeds the deletion path) and are never interpreted.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: String,
    /// URL after following redirects; relative hrefs resolve against this.
    pub final_url: Url,
}

impl SourceDocument {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Retrieves source documents through the transport, applying the configured
/// guards before any body is handed to interpretation.
#[derive(Debug, Clone)]
pub struct SourceFetcher {
    config: FetchConfig,
}

impl SourceFetcher {
    pub fn new(config: FetchConfig) -> Self {
        SourceFetcher { config }
    }

    /// Fetches `url` with redirects followed.
    ///
    /// Guard order for 2xx responses: declared `Content-Length` over the
    /// ceiling fails fast as `TooLarge` (the transport refuses the download),
    /// a declared non-`text` MIME type is `WrongContentType`, and an
    /// undeclared length is enforced by the transport's streaming cap.
    /// Non-2xx responses skip the type guard; their body is never
    /// interpreted.
    pub async fn fetch(
        &self,
        transport: &dyn HttpTransport,
        cache: &mut FetchCache,
        url: &Url,
    ) -> Result<SourceDocument, FetchError> {
        let request = HttpRequest {
            url: url.clone(),
            timeout: self.config.timeout,
            user_agent: self.config.user_agent.clone(),
            max_body_bytes: self.config.max_body_bytes,
            follow_redirects: true,
        };

        let response = cache.get(transport, request).await.map_err(|e| match e {
            TransportError::Network(msg) => FetchError::Network(msg),
            TransportError::Timeout => FetchError::Network("timed out".to_string()),
            TransportError::BodyTooLarge { limit } => FetchError::TooLarge { limit },
        })?;

        let content_type = response.header("content-type").map(str::to_string);
        let content_length = response
            .header("content-length")
            .and_then(|v| v.parse::<u64>().ok());

        if response.is_success() {
            if let Some(len) = content_length {
                if len > self.config.max_body_bytes as u64 {
                    return Err(FetchError::TooLarge {
                        limit: self.config.max_body_bytes,
                    });
                }
            }
            if let Some(ct) = &content_type {
                if !is_text_like(ct) {
                    return Err(FetchError::WrongContentType {
                        content_type: ct.clone(),
                    });
                }
            }
            if response.body.len() > self.config.max_body_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.config.max_body_bytes,
                });
            }
        }

        Ok(SourceDocument {
            status: response.status,
            content_type,
            content_length,
            body: response.body_text(),
            final_url: response.final_url.clone(),
        })
    }
}

/// Whether a declared MIME type has top-level type `text`.
fn is_text_like(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    essence
        .split('/')
        .next()
        .is_some_and(|top| top.eq_ignore_ascii_case("text"))
}
