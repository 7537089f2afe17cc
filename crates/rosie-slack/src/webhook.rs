//! Events API receiver (production).
//!
//! Slack POSTs signed JSON to `/slack/events`. Requests are verified against
//! the signing secret, acknowledged with 200 right away and routed in the
//! background.

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::EventHandler;

type HmacSha256 = Hmac<Sha256>;

/// Requests older than this are treated as replays.
const MAX_REQUEST_AGE_SECS: u64 = 60 * 5;

#[derive(Clone)]
pub struct WebhookState {
    signing_secret: String,
    handler: EventHandler,
}

impl WebhookState {
    pub fn new(signing_secret: impl Into<String>, handler: EventHandler) -> Self {
        Self {
            signing_secret: signing_secret.into(),
            handler,
        }
    }
}

pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/slack/events", post(handle_events))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}

/// Serve the webhook on `0.0.0.0:{port}` until `shutdown` fires.
pub async fn serve(
    port: u16,
    state: WebhookState,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind events webhook on {addr}"))?;
    tracing::info!(port, "Slack events webhook listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("events webhook exited with error")
}

/// Check `X-Slack-Signature` (`v0=<hex>`) over `v0:{timestamp}:{body}`.
pub fn verify_signature(
    secret: &str,
    timestamp: &str,
    body: &[u8],
    signature_header: &str,
    now_secs: i64,
) -> bool {
    let Ok(ts) = timestamp.parse::<i64>() else {
        return false;
    };
    if now_secs.abs_diff(ts) > MAX_REQUEST_AGE_SECS {
        return false;
    }

    let Some(hex_sig) = signature_header.strip_prefix("v0=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_sig) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };

    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

async fn handle_events(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> impl IntoResponse {
    if !verify_signature(
        &state.signing_secret,
        header(&headers, "X-Slack-Request-Timestamp"),
        &body,
        header(&headers, "X-Slack-Signature"),
        unix_now(),
    ) {
        tracing::warn!("rejected webhook request: invalid Slack signature");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "failed to parse webhook body as JSON");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    if payload["type"] == "url_verification" {
        let challenge = payload["challenge"].as_str().unwrap_or("").to_string();
        return Json(json!({ "challenge": challenge })).into_response();
    }

    // Slack redelivers when the first ack was slow; the original is already being handled.
    let retry = header(&headers, "X-Slack-Retry-Num");
    if !retry.is_empty() {
        tracing::info!(
            retry,
            reason = header(&headers, "X-Slack-Retry-Reason"),
            "skipping redelivered event"
        );
        return StatusCode::OK.into_response();
    }

    state.handler.dispatch(&payload);
    StatusCode::OK.into_response()
}
