use std::sync::Arc;

use crate::{
    domain::{ChannelId, MessageTs},
    messaging::{
        port::MessagingPort,
        types::{OutboundReply, PostedMessage},
    },
};

/// What happened to a reply. Dispatch never fails outward.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered(PostedMessage),
    /// The answer failed to post; an error notice was posted instead.
    FallbackDelivered,
    /// Both the answer and the error notice failed.
    Dropped,
}

/// Posts answers into threads, containing any platform failure.
#[derive(Clone)]
pub struct ReplyDispatcher {
    messenger: Arc<dyn MessagingPort>,
    bot_name: String,
}

impl ReplyDispatcher {
    pub fn new(messenger: Arc<dyn MessagingPort>, bot_name: impl Into<String>) -> Self {
        Self {
            messenger,
            bot_name: bot_name.into(),
        }
    }

    /// Answer a new topic in the thread rooted at `parent_ts`.
    pub async fn reply_to_parent(
        &self,
        channel_id: &ChannelId,
        parent_ts: &MessageTs,
        text: &str,
    ) -> DispatchOutcome {
        let reply = OutboundReply {
            channel_id: channel_id.clone(),
            thread_ts: parent_ts.clone(),
            text: self.fit(text),
            reply_to: None,
        };
        self.deliver("reply_to_parent", reply).await
    }

    /// Answer a reply inside an existing thread.
    ///
    /// `original_ts` travels with the reply for logging only; the post still
    /// lands in the thread rooted at `thread_ts`.
    pub async fn reply_to_reply(
        &self,
        channel_id: &ChannelId,
        thread_ts: &MessageTs,
        original_ts: &MessageTs,
        text: &str,
    ) -> DispatchOutcome {
        let reply = OutboundReply {
            channel_id: channel_id.clone(),
            thread_ts: thread_ts.clone(),
            text: self.fit(text),
            reply_to: Some(original_ts.clone()),
        };
        self.deliver("reply_to_reply", reply).await
    }

    /// Tell the thread that generating an answer failed. Best-effort.
    pub async fn report_failure(
        &self,
        channel_id: &ChannelId,
        thread_ts: &MessageTs,
        error: &crate::Error,
    ) -> bool {
        let notice = OutboundReply {
            channel_id: channel_id.clone(),
            thread_ts: thread_ts.clone(),
            text: self.fit(&format!(
                "{} had an error while generating an answer: {error}",
                self.bot_name
            )),
            reply_to: None,
        };
        match self.messenger.post_message(&notice).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(
                    channel = %channel_id,
                    thread_ts = %thread_ts,
                    error = %e,
                    "failed to post failure notice"
                );
                false
            }
        }
    }

    /// Cut `text` to the platform's message length limit.
    fn fit(&self, text: &str) -> String {
        let max = self.messenger.capabilities().max_message_len;
        match text.char_indices().nth(max) {
            Some((cut, _)) => {
                tracing::warn!(
                    chars = text.chars().count(),
                    max,
                    "reply exceeds message limit; truncating"
                );
                text[..cut].to_string()
            }
            None => text.to_string(),
        }
    }

    async fn deliver(&self, op: &str, reply: OutboundReply) -> DispatchOutcome {
        let err = match self.messenger.post_message(&reply).await {
            Ok(posted) => {
                tracing::info!(
                    channel = %posted.channel_id,
                    thread_ts = %reply.thread_ts,
                    reply_to = ?reply.reply_to.as_ref().map(|ts| ts.as_str()),
                    ts = %posted.ts,
                    "posted reply"
                );
                return DispatchOutcome::Delivered(posted);
            }
            Err(e) => e,
        };

        tracing::error!(
            op,
            channel = %reply.channel_id,
            thread_ts = %reply.thread_ts,
            error = %err,
            "failed to post reply"
        );

        let fallback = OutboundReply {
            channel_id: reply.channel_id.clone(),
            thread_ts: reply.thread_ts.clone(),
            text: self.fit(&format!("{} had an error in {op}: {err}", self.bot_name)),
            reply_to: None,
        };
        match self.messenger.post_message(&fallback).await {
            Ok(_) => DispatchOutcome::FallbackDelivered,
            Err(e) => {
                tracing::error!(
                    op,
                    channel = %reply.channel_id,
                    error = %e,
                    "failed to post fallback error message"
                );
                DispatchOutcome::Dropped
            }
        }
    }
}
