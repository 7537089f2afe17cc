//! Slack adapter.
//!
//! Implements the `rosie-core` MessagingPort over the Slack Web API and feeds
//! inbound events to the message router, either over Socket Mode or through
//! the Events API webhook.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub mod api;
pub mod events;
pub mod socket;
pub mod webhook;

use rosie_core::{
    config::{Config, ConnectionMode},
    domain::{ChannelId, MessageTs},
    messaging::{
        port::MessagingPort,
        types::{InboundMessage, MessagingCapabilities, OutboundReply, PostedMessage},
    },
    router::{MessageRouter, RouteOutcome},
    Result,
};

use crate::api::SlackApiClient;
use crate::events::{inbound_from_event_callback, BotIdentity};

/// Slack's hard limit on `chat.postMessage` text.
const SLACK_MAX_MESSAGE_LEN: usize = 40_000;

#[derive(Clone)]
pub struct SlackMessenger {
    api: SlackApiClient,
    identity: Arc<BotIdentity>,
}

impl SlackMessenger {
    pub fn new(api: SlackApiClient, identity: Arc<BotIdentity>) -> Self {
        Self { api, identity }
    }
}

#[async_trait]
impl MessagingPort for SlackMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            max_message_len: SLACK_MAX_MESSAGE_LEN,
        }
    }

    async fn fetch_replies(
        &self,
        channel_id: &ChannelId,
        thread_ts: &MessageTs,
    ) -> Result<Vec<InboundMessage>> {
        let messages = self
            .api
            .conversations_replies(channel_id.as_str(), thread_ts.as_str())
            .await?;
        Ok(messages
            .into_iter()
            .filter_map(|m| m.into_inbound(channel_id, &self.identity))
            .collect())
    }

    async fn post_message(&self, reply: &OutboundReply) -> Result<PostedMessage> {
        // chat.postMessage threads by root only; `reply_to` does not change routing.
        let posted = self
            .api
            .post_message(
                reply.channel_id.as_str(),
                &reply.text,
                Some(reply.thread_ts.as_str()),
            )
            .await?;
        Ok(PostedMessage {
            channel_id: ChannelId(posted.channel),
            ts: MessageTs(posted.ts),
        })
    }
}

/// Turns raw event callbacks into router tasks.
#[derive(Clone)]
pub struct EventHandler {
    router: Arc<MessageRouter>,
    identity: Arc<BotIdentity>,
}

impl EventHandler {
    pub fn new(router: Arc<MessageRouter>, identity: Arc<BotIdentity>) -> Self {
        Self { router, identity }
    }

    /// Spawn a handler task for `payload` if it carries a routable message.
    pub fn dispatch(&self, payload: &Value) -> Option<JoinHandle<RouteOutcome>> {
        let msg = inbound_from_event_callback(payload, &self.identity)?;
        let router = self.router.clone();
        Some(tokio::spawn(async move { router.handle(msg).await }))
    }
}

/// Receive events until `shutdown` fires, using the connection mode from config.
pub async fn run(
    cfg: Arc<Config>,
    api: SlackApiClient,
    handler: EventHandler,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    match cfg.connection_mode {
        ConnectionMode::Socket => {
            tracing::info!("starting Slack socket mode receiver");
            socket::run_socket_mode(api, handler, cfg.socket_reconnect_delay, shutdown).await
        }
        ConnectionMode::Webhook => {
            let secret = cfg
                .slack_signing_secret
                .clone()
                .context("events webhook requires a signing secret")?;
            webhook::serve(cfg.port, webhook::WebhookState::new(secret, handler), shutdown).await
        }
    }
}
