//! HTTP transport capability.
//!
//! A thin GET/POST abstraction so the engine can run against a mock in tests.
//! The real implementation wraps `reqwest` with rustls and enforces the body
//! ceiling while streaming, so an over-limit source is abandoned mid-download
//! rather than buffered.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Transport-level failures, before protocol interpretation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    /// The response body exceeded the request's byte ceiling, either by
    /// declared Content-Length (no download happens) or while streaming.
    #[error("response body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },
}

/// One outbound GET.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: Url,
    pub timeout: Duration,
    pub user_agent: String,
    pub max_body_bytes: usize,
    /// When false, 3xx responses are returned as-is with their Location
    /// header intact; the caller follows hops itself.
    pub follow_redirects: bool,
}

/// A raw HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Header (name, value) pairs with lowercased names.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// URL after any transport-followed redirects.
    pub final_url: Url,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Outbound HTTP capability.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, req: HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Fire-and-forget JSON POST, used for sender callbacks. Returns the
    /// response status.
    async fn post_json(
        &self,
        url: &Url,
        body: &serde_json::Value,
        user_agent: &str,
    ) -> Result<u16, TransportError>;
}

/// `reqwest`-backed transport.
pub struct ReqwestTransport {
    /// Client that follows redirects (source fetches).
    following: reqwest::Client,
    /// Client that surfaces 3xx responses (target resolution hops).
    direct: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let following = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let direct = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(ReqwestTransport { following, direct })
    }
}

fn map_reqwest(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(e.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, req: HttpRequest) -> Result<HttpResponse, TransportError> {
        let client = if req.follow_redirects {
            &self.following
        } else {
            &self.direct
        };

        let response = client
            .get(req.url.clone())
            .timeout(req.timeout)
            .header(reqwest::header::USER_AGENT, req.user_agent.clone())
            .send()
            .await
            .map_err(map_reqwest)?;

        // Declared length over the ceiling: refuse without downloading.
        if let Some(len) = response.content_length() {
            if len > req.max_body_bytes as u64 {
                return Err(TransportError::BodyTooLarge {
                    limit: req.max_body_bytes,
                });
            }
        }

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(n, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (n.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        // Stream with a running cap for responses with no declared length.
        let mut body = Vec::new();
        let mut response = response;
        while let Some(chunk) = response.chunk().await.map_err(map_reqwest)? {
            if body.len() + chunk.len() > req.max_body_bytes {
                return Err(TransportError::BodyTooLarge {
                    limit: req.max_body_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(HttpResponse {
            status,
            headers,
            body,
            final_url,
        })
    }

    async fn post_json(
        &self,
        url: &Url,
        body: &serde_json::Value,
        user_agent: &str,
    ) -> Result<u16, TransportError> {
        let response = self
            .following
            .post(url.clone())
            .header(reqwest::header::USER_AGENT, user_agent)
            .json(body)
            .send()
            .await
            .map_err(map_reqwest)?;
        Ok(response.status().as_u16())
    }
}
