//! Slack Web API client: identity, thread history and posting.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use rosie_core::{errors::Error, Result};

use crate::events::{BotIdentity, SlackMessage};

/// Page size for `conversations.replies`.
const REPLIES_PAGE_LIMIT: u32 = 200;

#[derive(Debug, Deserialize)]
struct SlackAuthTestResponse {
    ok: bool,
    user_id: Option<String>,
    bot_id: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SlackOpenSocketResponse {
    ok: bool,
    url: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SlackRepliesResponse {
    ok: bool,
    #[serde(default)]
    messages: Vec<SlackMessage>,
    response_metadata: Option<SlackResponseMetadata>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SlackResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Debug, Deserialize)]
struct SlackChatMessageResponse {
    ok: bool,
    channel: Option<String>,
    ts: Option<String>,
    error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackPostedMessage {
    pub channel: String,
    pub ts: String,
}

#[derive(Clone)]
pub struct SlackApiClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    app_token: Option<String>,
}

impl SlackApiClient {
    pub fn new(
        api_base: impl Into<String>,
        bot_token: impl Into<String>,
        app_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("slack client build failed: {e}")))?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into().trim().to_string(),
            app_token: app_token.map(|t| t.trim().to_string()),
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.api_base)
    }

    /// Resolve our own user id and bot id (`auth.test`).
    pub async fn auth_test(&self) -> Result<BotIdentity> {
        let resp: SlackAuthTestResponse = self
            .send(
                "auth.test",
                self.http.post(self.url("auth.test")).bearer_auth(&self.bot_token),
            )
            .await?;
        if !resp.ok {
            return Err(Error::Config(format!(
                "slack auth.test failed: {}",
                error_code(resp.error)
            )));
        }
        let user_id = resp
            .user_id
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                Error::External("slack auth.test did not return user_id".to_string())
            })?;
        Ok(BotIdentity {
            user_id,
            bot_id: resp.bot_id.filter(|v| !v.trim().is_empty()),
        })
    }

    /// Open a Socket Mode connection and return its WebSocket URL.
    pub async fn open_socket_connection(&self) -> Result<String> {
        let app_token = self
            .app_token
            .as_deref()
            .ok_or_else(|| Error::Config("socket mode requires an app-level token".to_string()))?;
        let resp: SlackOpenSocketResponse = self
            .send(
                "apps.connections.open",
                self.http
                    .post(self.url("apps.connections.open"))
                    .bearer_auth(app_token),
            )
            .await?;
        if !resp.ok {
            return Err(Error::Transport(format!(
                "slack apps.connections.open failed: {}",
                error_code(resp.error)
            )));
        }
        resp.url.filter(|v| !v.trim().is_empty()).ok_or_else(|| {
            Error::Transport("slack apps.connections.open did not return url".to_string())
        })
    }

    /// Every message of a thread, root first, following cursor pagination.
    pub async fn conversations_replies(
        &self,
        channel: &str,
        thread_ts: &str,
    ) -> Result<Vec<SlackMessage>> {
        let mut out = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut query = vec![
                ("channel", channel.to_string()),
                ("ts", thread_ts.to_string()),
                ("limit", REPLIES_PAGE_LIMIT.to_string()),
            ];
            if let Some(c) = &cursor {
                query.push(("cursor", c.clone()));
            }

            let resp: SlackRepliesResponse = self
                .send(
                    "conversations.replies",
                    self.http
                        .get(self.url("conversations.replies"))
                        .bearer_auth(&self.bot_token)
                        .query(&query),
                )
                .await?;
            if !resp.ok {
                return Err(Error::Transport(format!(
                    "slack conversations.replies failed: {}",
                    error_code(resp.error)
                )));
            }
            out.extend(resp.messages);

            cursor = resp
                .response_metadata
                .map(|m| m.next_cursor)
                .filter(|c| !c.is_empty());
            if cursor.is_none() {
                return Ok(out);
            }
        }
    }

    /// `chat.postMessage` into the thread rooted at `thread_ts`.
    pub async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<SlackPostedMessage> {
        let mut payload = json!({
            "channel": channel,
            "text": text,
        });
        if let Some(ts) = thread_ts {
            payload["thread_ts"] = json!(ts);
        }

        let resp: SlackChatMessageResponse = self
            .send(
                "chat.postMessage",
                self.http
                    .post(self.url("chat.postMessage"))
                    .bearer_auth(&self.bot_token)
                    .json(&payload),
            )
            .await
            .map_err(|e| Error::Dispatch(e.to_string()))?;
        if !resp.ok {
            return Err(Error::Dispatch(format!(
                "slack chat.postMessage failed: {}",
                error_code(resp.error)
            )));
        }

        Ok(SlackPostedMessage {
            channel: resp.channel.unwrap_or_else(|| channel.to_string()),
            ts: resp.ts.ok_or_else(|| {
                Error::Dispatch("slack chat.postMessage response missing ts".to_string())
            })?,
        })
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        req: reqwest::RequestBuilder,
    ) -> Result<T> {
        let resp = req
            .send()
            .await
            .map_err(|e| Error::Transport(format!("slack {method} request error: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(|v| format!(" (retry after {v}s)"))
                .unwrap_or_default();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Transport(format!(
                "slack {method} failed: {status}{retry_after} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        resp.json::<T>()
            .await
            .map_err(|e| Error::Transport(format!("slack {method} json error: {e}")))
    }
}

fn error_code(error: Option<String>) -> String {
    error.unwrap_or_else(|| "unknown error".to_string())
}
