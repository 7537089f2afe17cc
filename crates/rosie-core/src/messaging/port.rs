use async_trait::async_trait;

use crate::{
    domain::{ChannelId, MessageTs},
    messaging::types::{InboundMessage, MessagingCapabilities, OutboundReply, PostedMessage},
    Result,
};

/// Messenger port.
///
/// Slack is the only implementation; the router and dispatcher only ever talk
/// to the platform through this trait.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    /// All messages of a thread, root included, in platform (chronological) order.
    async fn fetch_replies(
        &self,
        channel_id: &ChannelId,
        thread_ts: &MessageTs,
    ) -> Result<Vec<InboundMessage>>;

    async fn post_message(&self, reply: &OutboundReply) -> Result<PostedMessage>;
}
