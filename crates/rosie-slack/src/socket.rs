//! Socket Mode receiver (development).
//!
//! Opens a WebSocket with the app-level token, acknowledges every envelope and
//! hands `events_api` payloads to the event handler. Reconnects after a delay
//! whenever the session ends.

use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tokio_util::sync::CancellationToken;

use crate::{api::SlackApiClient, EventHandler};

#[derive(Debug, Deserialize)]
pub(crate) struct SocketEnvelope {
    #[serde(default)]
    pub(crate) envelope_id: Option<String>,
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[serde(default)]
    pub(crate) payload: Value,
    #[serde(default)]
    pub(crate) reason: Option<String>,
}

/// What the session loop should do after an envelope.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum EnvelopeAction {
    Continue,
    Reconnect,
}

pub async fn run_socket_mode(
    api: SlackApiClient,
    handler: EventHandler,
    reconnect_delay: Duration,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    loop {
        let opened = tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            r = api.open_socket_connection() => r,
        };

        match opened {
            Ok(url) => {
                tracing::info!("slack socket connected");
                if let Err(e) = run_socket_session(&url, &handler, &shutdown).await {
                    tracing::warn!(error = %e, "slack socket session ended with error");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to open slack socket connection");
            }
        }

        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("slack socket shutdown requested");
                return Ok(());
            }
            _ = tokio::time::sleep(reconnect_delay) => {}
        }
    }
}

async fn run_socket_session(
    url: &str,
    handler: &EventHandler,
    shutdown: &CancellationToken,
) -> anyhow::Result<()> {
    let (stream, _response) = connect_async(url)
        .await
        .context("failed to connect slack socket mode websocket")?;
    let (mut sink, mut source) = stream.split();

    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = sink.send(WsMessage::Close(None)).await;
                return Ok(());
            }
            next = source.next() => next,
        };
        let Some(frame) = next else {
            return Ok(());
        };
        let frame = frame.context("failed reading slack websocket message")?;

        let Some(envelope) = parse_socket_envelope(frame) else {
            continue;
        };
        if let Some(id) = &envelope.envelope_id {
            let ack = json!({ "envelope_id": id }).to_string();
            sink.send(WsMessage::Text(ack.into()))
                .await
                .context("failed to send slack socket ack")?;
        }

        if handle_envelope(envelope, handler) == EnvelopeAction::Reconnect {
            return Ok(());
        }
    }
}

pub(crate) fn handle_envelope(envelope: SocketEnvelope, handler: &EventHandler) -> EnvelopeAction {
    match envelope.kind.as_str() {
        "hello" => {
            tracing::debug!("slack socket hello");
            EnvelopeAction::Continue
        }
        "disconnect" => {
            tracing::info!(reason = ?envelope.reason, "slack requested socket reconnect");
            EnvelopeAction::Reconnect
        }
        "events_api" => {
            handler.dispatch(&envelope.payload);
            EnvelopeAction::Continue
        }
        other => {
            tracing::debug!(kind = other, "ignoring socket envelope");
            EnvelopeAction::Continue
        }
    }
}

/// Decode one frame. Control frames and undecodable payloads yield `None`.
pub(crate) fn parse_socket_envelope(message: WsMessage) -> Option<SocketEnvelope> {
    let text = match message {
        WsMessage::Text(text) => text.as_str().to_owned(),
        WsMessage::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "skipping non utf-8 slack socket payload");
                return None;
            }
        },
        WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Close(_) | WsMessage::Frame(_) => {
            return None
        }
    };
    match serde_json::from_str::<SocketEnvelope>(&text) {
        Ok(envelope) => Some(envelope),
        Err(e) => {
            tracing::warn!(error = %e, "skipping malformed slack socket envelope");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rosie_core::domain::MessageTs;

    use super::*;
    use crate::test_support::{handler, FakeMessenger};

    #[test]
    fn parses_text_envelopes_and_skips_control_frames() {
        let env = parse_socket_envelope(WsMessage::Text(
            r#"{"envelope_id":"e1","type":"events_api","payload":{"type":"event_callback"}}"#.into(),
        ))
        .unwrap();
        assert_eq!(env.envelope_id.as_deref(), Some("e1"));
        assert_eq!(env.kind, "events_api");

        assert!(parse_socket_envelope(WsMessage::Ping(Vec::new().into())).is_none());
    }

    #[test]
    fn malformed_envelopes_are_skipped_not_fatal() {
        assert!(parse_socket_envelope(WsMessage::Text("nope".into())).is_none());
        let untyped = WsMessage::Text(r#"{"envelope_id":"e1"}"#.into());
        assert!(parse_socket_envelope(untyped).is_none());
        assert!(parse_socket_envelope(WsMessage::Binary(vec![0xff, 0xfe].into())).is_none());
    }

    #[tokio::test]
    async fn disconnect_requests_reconnect() {
        let h = handler(Arc::new(FakeMessenger::default()));
        let env = SocketEnvelope {
            envelope_id: None,
            kind: "disconnect".to_string(),
            payload: Value::Null,
            reason: Some("refresh_requested".to_string()),
        };
        assert_eq!(handle_envelope(env, &h), EnvelopeAction::Reconnect);

        let hello = SocketEnvelope {
            envelope_id: None,
            kind: "hello".to_string(),
            payload: Value::Null,
            reason: None,
        };
        assert_eq!(handle_envelope(hello, &h), EnvelopeAction::Continue);
    }

    #[tokio::test]
    async fn events_api_envelope_reaches_router() {
        let messenger = Arc::new(FakeMessenger::default());
        let h = handler(messenger.clone());
        let env = SocketEnvelope {
            envelope_id: Some("e1".to_string()),
            kind: "events_api".to_string(),
            payload: json!({
                "type": "event_callback",
                "event": { "type": "message", "channel": "C1", "user": "U1", "text": "Hi", "ts": "100.1" }
            }),
            reason: None,
        };
        assert_eq!(handle_envelope(env, &h), EnvelopeAction::Continue);

        for _ in 0..100 {
            if !messenger.posts.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let posts = messenger.posts.lock().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].thread_ts, MessageTs::new("100.1"));
    }
}
