//! Slack event payloads and their normalization into core messages.

use serde::Deserialize;
use serde_json::Value;

use rosie_core::{
    domain::{ChannelId, MessageTs, UserId},
    messaging::types::{InboundMessage, Origin},
};

/// Who we are on Slack, resolved with `auth.test` at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BotIdentity {
    pub user_id: String,
    pub bot_id: Option<String>,
}

/// A Slack message as found in `message` events and `conversations.replies`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SlackMessage {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
    /// Present on events, absent on `conversations.replies` entries.
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub thread_ts: Option<String>,
}

impl SlackMessage {
    pub fn origin(&self, me: &BotIdentity) -> Origin {
        let is_me = match (&self.bot_id, &me.bot_id) {
            (Some(theirs), Some(ours)) if theirs == ours => true,
            _ => self.user.as_deref() == Some(me.user_id.as_str()),
        };
        if is_me {
            Origin::SelfBot
        } else if self.bot_id.is_some() || self.subtype.as_deref() == Some("bot_message") {
            Origin::OtherBot
        } else {
            Origin::Human
        }
    }

    /// Subtypes that carry a fresh, user-visible message. Edits, deletions,
    /// joins and other housekeeping events are not routed.
    pub fn is_routable(&self) -> bool {
        matches!(
            self.subtype.as_deref(),
            None | Some("bot_message") | Some("thread_broadcast") | Some("file_share")
                | Some("me_message")
        )
    }

    /// Convert into a core message. `channel` is used when the payload has none.
    pub fn into_inbound(self, channel: &ChannelId, me: &BotIdentity) -> Option<InboundMessage> {
        let origin = self.origin(me);
        let ts = self.ts.filter(|t| !t.is_empty())?;
        Some(InboundMessage {
            channel_id: self.channel.map(ChannelId).unwrap_or_else(|| channel.clone()),
            ts: MessageTs(ts),
            thread_ts: self.thread_ts.filter(|t| !t.is_empty()).map(MessageTs),
            author_id: self.user.map(UserId),
            text: self.text,
            origin,
        })
    }
}

#[derive(Debug, Deserialize)]
struct EventCallback {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    event_id: Option<String>,
    event: Value,
}

/// Extract a routable message from an Events API `event_callback` body.
///
/// Returns `None` for other callback types, non-message events, housekeeping
/// subtypes and malformed payloads.
pub fn inbound_from_event_callback(payload: &Value, me: &BotIdentity) -> Option<InboundMessage> {
    let callback = match EventCallback::deserialize(payload) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "malformed event callback");
            return None;
        }
    };
    if callback.kind != "event_callback" {
        return None;
    }

    let msg = match SlackMessage::deserialize(&callback.event) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(error = %e, event_id = ?callback.event_id, "malformed message event");
            return None;
        }
    };
    if msg.kind.as_deref() != Some("message") || !msg.is_routable() {
        tracing::debug!(
            event_id = ?callback.event_id,
            kind = ?msg.kind,
            subtype = ?msg.subtype,
            "skipping event"
        );
        return None;
    }

    let channel = ChannelId(msg.channel.clone()?);
    msg.into_inbound(&channel, me)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn me() -> BotIdentity {
        BotIdentity {
            user_id: "UBOT".to_string(),
            bot_id: Some("BBOT".to_string()),
        }
    }

    fn callback(event: Value) -> Value {
        json!({
            "type": "event_callback",
            "event_id": "Ev1",
            "team_id": "T1",
            "event": event
        })
    }

    #[test]
    fn human_message_in_channel() {
        let payload = callback(json!({
            "type": "message",
            "channel": "C1",
            "user": "U1",
            "text": "Hi",
            "ts": "100.1"
        }));
        let msg = inbound_from_event_callback(&payload, &me()).unwrap();
        assert_eq!(msg.channel_id, ChannelId::new("C1"));
        assert_eq!(msg.ts, MessageTs::new("100.1"));
        assert_eq!(msg.thread_ts, None);
        assert_eq!(msg.author_id, Some(UserId::new("U1")));
        assert_eq!(msg.text, "Hi");
        assert_eq!(msg.origin, Origin::Human);
    }

    #[test]
    fn threaded_reply_keeps_thread_ts() {
        let payload = callback(json!({
            "type": "message",
            "channel": "C1",
            "user": "U1",
            "text": "more",
            "ts": "100.5",
            "thread_ts": "100.1"
        }));
        let msg = inbound_from_event_callback(&payload, &me()).unwrap();
        assert_eq!(msg.thread_ts, Some(MessageTs::new("100.1")));
        assert!(msg.is_continuation());
    }

    #[test]
    fn housekeeping_subtypes_are_dropped() {
        for subtype in ["message_changed", "message_deleted", "channel_join"] {
            let payload = callback(json!({
                "type": "message",
                "subtype": subtype,
                "channel": "C1",
                "ts": "100.1"
            }));
            assert!(inbound_from_event_callback(&payload, &me()).is_none(), "{subtype}");
        }
    }

    #[test]
    fn non_message_events_are_dropped() {
        let payload = callback(json!({
            "type": "reaction_added",
            "user": "U1",
            "reaction": "tada"
        }));
        assert!(inbound_from_event_callback(&payload, &me()).is_none());
        assert!(inbound_from_event_callback(&json!({ "type": "url_verification" }), &me()).is_none());
    }

    #[test]
    fn origin_classification() {
        let mine = SlackMessage {
            bot_id: Some("BBOT".to_string()),
            ..Default::default()
        };
        assert_eq!(mine.origin(&me()), Origin::SelfBot);

        let as_user = SlackMessage {
            user: Some("UBOT".to_string()),
            ..Default::default()
        };
        assert_eq!(as_user.origin(&me()), Origin::SelfBot);

        let other = SlackMessage {
            bot_id: Some("BOTHER".to_string()),
            user: Some("UOTHER".to_string()),
            ..Default::default()
        };
        assert_eq!(other.origin(&me()), Origin::OtherBot);

        let legacy = SlackMessage {
            subtype: Some("bot_message".to_string()),
            ..Default::default()
        };
        assert_eq!(legacy.origin(&me()), Origin::OtherBot);

        let human = SlackMessage {
            user: Some("U1".to_string()),
            ..Default::default()
        };
        assert_eq!(human.origin(&me()), Origin::Human);
    }

    #[test]
    fn reply_entries_take_channel_from_caller() {
        let m: SlackMessage = serde_json::from_value(json!({
            "type": "message",
            "user": "U1",
            "text": "Q1",
            "ts": "100.1",
            "thread_ts": "100.1"
        }))
        .unwrap();
        let msg = m.into_inbound(&ChannelId::new("C9"), &me()).unwrap();
        assert_eq!(msg.channel_id, ChannelId::new("C9"));
        assert!(msg.is_parent());
    }

    #[test]
    fn message_without_ts_is_skipped() {
        let m = SlackMessage {
            text: "x".to_string(),
            ..Default::default()
        };
        assert!(m.into_inbound(&ChannelId::new("C1"), &me()).is_none());
    }
}
