use crate::domain::{ChannelId, MessageTs, UserId};

/// Who produced an inbound message, as far as the platform tells us.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    Human,
    /// Posted by this bot.
    SelfBot,
    /// Posted by some other bot or integration.
    OtherBot,
}

/// Platform-neutral inbound message.
///
/// Slack-specific fields stay in the Slack adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub channel_id: ChannelId,
    pub ts: MessageTs,
    pub thread_ts: Option<MessageTs>,
    pub author_id: Option<UserId>,
    pub text: String,
    pub origin: Origin,
}

impl InboundMessage {
    pub fn is_threaded(&self) -> bool {
        self.thread_ts.is_some()
    }

    /// The message is the root of its own thread.
    pub fn is_parent(&self) -> bool {
        self.thread_ts.as_ref() == Some(&self.ts)
    }

    /// A reply inside an existing thread (not the thread's first message).
    pub fn is_continuation(&self) -> bool {
        self.is_threaded() && !self.is_parent()
    }

    pub fn is_from_bot(&self) -> bool {
        self.origin != Origin::Human
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundReply {
    pub channel_id: ChannelId,
    pub thread_ts: MessageTs,
    pub text: String,
    /// The reply being answered. Informational: Slack threads only to the root.
    pub reply_to: Option<MessageTs>,
}

/// Confirmation of a posted message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel_id: ChannelId,
    pub ts: MessageTs,
}

/// Platform limits the dispatcher has to respect.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    /// Longest accepted post text, in characters.
    pub max_message_len: usize,
}
