//! Webmention acceptance and status endpoints.
//!
//! Acceptance is deliberately thin: presence of the form fields is the only
//! check made synchronously. Everything else, URL validation included,
//! happens in the dispatcher after `202` has gone out, and is visible
//! through the status endpoint or the optional callback.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use super::AppState;
use crate::types::ClaimId;
use crate::worker::ClaimStatus;

/// Errors answered synchronously by the acceptance endpoint.
#[derive(Debug, Error)]
pub enum AcceptError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("callback is not a valid URL")]
    InvalidCallback,
}

impl IntoResponse for AcceptError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

/// The webmention form body. Fields are optional so their absence is our
/// 400, not a generic extractor rejection.
#[derive(Debug, Deserialize)]
pub struct MentionForm {
    pub source: Option<String>,
    pub target: Option<String>,
    pub callback: Option<String>,
}

/// `POST /webmention`.
///
/// Answers `202` with `{"status": "queued", "id": ...}` once the claim is
/// registered and handed to the dispatcher.
pub async fn accept_handler(
    State(app_state): State<AppState>,
    axum::Form(form): axum::Form<MentionForm>,
) -> Result<(StatusCode, Json<serde_json::Value>), AcceptError> {
    let source = form.source.ok_or(AcceptError::MissingField("source"))?;
    let target = form.target.ok_or(AcceptError::MissingField("target"))?;
    let callback = form
        .callback
        .map(|raw| Url::parse(&raw))
        .transpose()
        .map_err(|_| AcceptError::InvalidCallback)?;

    let claim_id = ClaimId::random();
    info!(%claim_id, %source, %target, "claim accepted");

    let dispatcher = app_state.dispatcher().clone();
    dispatcher.tracker().begin(claim_id.clone()).await;

    let id_for_task = claim_id.clone();
    tokio::spawn(async move {
        dispatcher
            .submit(id_for_task, &source, &target, callback)
            .await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({"status": "queued", "id": claim_id})),
    ))
}

/// `GET /webmention/{id}`.
pub async fn status_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let claim_id = ClaimId::new(id);
    match app_state.dispatcher().tracker().status(&claim_id).await {
        Some(status) => {
            debug!(%claim_id, done = !matches!(status, ClaimStatus::Pending), "status read");
            Json(status.to_json()).into_response()
        }
        None => (StatusCode::NOT_FOUND, "unknown claim id").into_response(),
    }
}
