use crate::{
    domain::{ChannelId, MessageTs},
    messaging::{port::MessagingPort, types::InboundMessage},
    Result,
};

/// Messages of one thread, in platform order (oldest first, root included).
///
/// A read-only snapshot fetched fresh for every continuation; never cached.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ThreadTranscript {
    messages: Vec<InboundMessage>,
}

impl ThreadTranscript {
    pub fn new(messages: Vec<InboundMessage>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[InboundMessage] {
        &self.messages
    }

    /// Cap the transcript at `limit` messages, evicting the oldest turns first.
    ///
    /// The thread root always survives so the model keeps the opening question.
    /// `limit == 0` means unbounded.
    pub fn windowed(mut self, limit: usize) -> Self {
        if limit == 0 || self.messages.len() <= limit {
            return self;
        }
        if limit == 1 {
            self.messages.truncate(1);
            return self;
        }
        let evict = self.messages.len() - limit;
        self.messages.drain(1..1 + evict);
        self
    }
}

/// Fetch the full transcript of the thread rooted at `thread_ts`.
///
/// Platform failures propagate; there is no local retry.
pub async fn fetch_transcript(
    messenger: &dyn MessagingPort,
    channel_id: &ChannelId,
    thread_ts: &MessageTs,
) -> Result<ThreadTranscript> {
    let messages = messenger.fetch_replies(channel_id, thread_ts).await?;
    tracing::debug!(
        channel = %channel_id,
        thread_ts = %thread_ts,
        count = messages.len(),
        "fetched thread history"
    );
    Ok(ThreadTranscript::new(messages))
}
