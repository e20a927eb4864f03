//! HTTP surface.
//!
//! - `POST /webmention` accepts a claim and answers `202` immediately; the
//!   disposition is decided asynchronously by the worker system.
//! - `GET /webmention/{id}` reports where an accepted claim stands.
//! - `GET /health` for liveness probes.

use std::sync::Arc;

pub mod health;
pub mod mention;

pub use health::health_handler;
pub use mention::{accept_handler, status_handler};

use crate::worker::Dispatcher;

/// Shared application state, passed to handlers via axum's `State`
/// extractor.
#[derive(Clone)]
pub struct AppState {
    dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        AppState { dispatcher }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/webmention", post(accept_handler))
        .route("/webmention/{id}", get(status_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use url::Url;

    use crate::config::EngineConfig;
    use crate::mf2::ClassScanParser;
    use crate::notify::NoopNotifier;
    use crate::protocol::Engine;
    use crate::test_utils::{site_store, Page, PageTransport};
    use crate::types::ClaimId;
    use crate::worker::{ClaimStatus, ClaimTracker};

    const SHORT: &str = "https://example.com/n/Ab3x";
    const SOURCE: &str = "https://reader.example/reply-1";

    fn test_stack() -> (AppState, Arc<PageTransport>, Arc<ClaimTracker>) {
        let store = Arc::new(site_store());
        let transport = Arc::new(PageTransport::default());
        let engine = Arc::new(Engine::new(
            EngineConfig::new(Url::parse("https://example.com/").unwrap()),
            store.clone(),
            store,
            transport.clone(),
            Arc::new(ClassScanParser),
            Arc::new(NoopNotifier),
        ));
        let tracker = Arc::new(ClaimTracker::new());
        let dispatcher = Arc::new(Dispatcher::new(engine, tracker.clone()));
        (AppState::new(dispatcher), transport, tracker)
    }

    fn mention_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/webmention")
            .header(
                header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Polls the tracker until the claim leaves pending.
    async fn wait_for_done(tracker: &ClaimTracker, id: &ClaimId) -> ClaimStatus {
        for _ in 0..100 {
            match tracker.status(id).await {
                Some(ClaimStatus::Pending) | None => {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
                Some(done) => return done,
            }
        }
        panic!("claim {} never finished", id);
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let (state, _, _) = test_stack();
        let app = build_router(state);

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn missing_target_field_is_400() {
        let (state, _, _) = test_stack();
        let app = build_router(state);

        let response = app
            .oneshot(mention_request("source=https%3A%2F%2Freader.example%2Fx"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn accepted_claim_gets_202_and_a_handle() {
        let (state, transport, tracker) = test_stack();
        transport.serve(
            SOURCE,
            Page::html(format!(
                r#"<article class="h-entry">
                   <a class="u-in-reply-to" href="{SHORT}">post</a>
                   <div class="e-content">Nice post!</div>
                   </article>"#
            )),
        );
        let app = build_router(state);

        let body = format!(
            "source={}&target={}",
            urlencode(SOURCE),
            urlencode(SHORT)
        );
        let response = app.oneshot(mention_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let json = json_body(response).await;
        assert_eq!(json["status"], "queued");
        let id = ClaimId::new(json["id"].as_str().unwrap());

        let done = wait_for_done(&tracker, &id).await;
        match done {
            ClaimStatus::Done(outcome) => {
                assert_eq!(outcome.response_code, 200);
                assert_eq!(outcome.status, "success");
            }
            other => panic!("expected done, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn malformed_source_is_rejected_asynchronously() {
        let (state, _, tracker) = test_stack();
        let app = build_router(state);

        let body = format!("source=not-a-url&target={}", urlencode(SHORT));
        let response = app.oneshot(mention_request(&body)).await.unwrap();
        // Acceptance only checks presence; the rejection lands in tracking.
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let json = json_body(response).await;
        let id = ClaimId::new(json["id"].as_str().unwrap());
        match wait_for_done(&tracker, &id).await {
            ClaimStatus::Done(outcome) => {
                assert_eq!(outcome.response_code, 400);
                assert_eq!(outcome.reason, "malformed source or target");
            }
            other => panic!("expected done, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn status_endpoint_reports_pending_then_outcome() {
        let (state, transport, tracker) = test_stack();
        transport.serve(SOURCE, Page::status_only(410));
        let app = build_router(state.clone());

        let body = format!(
            "source={}&target={}",
            urlencode(SOURCE),
            urlencode(SHORT)
        );
        let response = app.oneshot(mention_request(&body)).await.unwrap();
        let json = json_body(response).await;
        let id = ClaimId::new(json["id"].as_str().unwrap());

        wait_for_done(&tracker, &id).await;

        let request = Request::builder()
            .uri(format!("/webmention/{}", id))
            .body(Body::empty())
            .unwrap();
        let response = build_router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["status"], "success");
        assert_eq!(json["response_code"], 200);
    }

    #[tokio::test]
    async fn unknown_claim_id_is_404() {
        let (state, _, _) = test_stack();
        let app = build_router(state);

        let request = Request::builder()
            .uri("/webmention/no-such-id")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn callback_is_delivered_with_the_outcome() {
        let (state, transport, tracker) = test_stack();
        transport.serve(
            SOURCE,
            Page::html(format!(
                r#"<article class="h-entry">
                   <a class="u-like-of" href="{SHORT}">post</a>
                   </article>"#
            )),
        );
        let app = build_router(state);

        let body = format!(
            "source={}&target={}&callback={}",
            urlencode(SOURCE),
            urlencode(SHORT),
            urlencode("https://reader.example/hook")
        );
        let response = app.oneshot(mention_request(&body)).await.unwrap();
        let json = json_body(response).await;
        let id = ClaimId::new(json["id"].as_str().unwrap());
        wait_for_done(&tracker, &id).await;

        let calls = transport.recorded_callbacks();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].0,
            Url::parse("https://reader.example/hook").unwrap()
        );
        assert_eq!(calls[0].1["status"], "success");
    }

    /// Minimal percent-encoding for form values in tests.
    fn urlencode(raw: &str) -> String {
        let mut out = String::new();
        for byte in raw.bytes() {
            match byte {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                    out.push(byte as char)
                }
                _ => out.push_str(&format!("%{:02X}", byte)),
            }
        }
        out
    }
}
