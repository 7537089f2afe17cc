use std::sync::Arc;

use crate::{
    dispatch::{DispatchOutcome, ReplyDispatcher},
    domain::MessageTs,
    hashing::user_tag,
    history::fetch_transcript,
    messaging::{
        port::MessagingPort,
        types::{InboundMessage, Origin},
    },
    model::client::Completer,
    prompt::PromptTemplates,
    Error, Result,
};

#[derive(Clone, Debug)]
pub struct RouterConfig {
    /// Answer messages from other bots. The bot never answers itself.
    pub respond_to_bots: bool,
    /// Transcript window for continuations; 0 = unbounded.
    pub thread_history_limit: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            respond_to_bots: false,
            thread_history_limit: 50,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    NewTopic,
    Continuation,
}

impl Route {
    pub fn classify(msg: &InboundMessage) -> Self {
        if msg.is_continuation() {
            Route::Continuation
        } else {
            Route::NewTopic
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    OwnMessage,
    BotMessage,
    EmptyText,
}

#[derive(Debug, PartialEq, Eq)]
pub enum RouteOutcome {
    Ignored(IgnoreReason),
    Answered {
        route: Route,
        dispatch: DispatchOutcome,
    },
    /// Generation failed; `reported` tells whether the notice reached the thread.
    Failed { route: Route, reported: bool },
}

/// Top-level inbound message handler.
///
/// Holds no per-event state; one instance is shared by every handler task.
pub struct MessageRouter {
    cfg: RouterConfig,
    templates: Arc<PromptTemplates>,
    messenger: Arc<dyn MessagingPort>,
    completer: Completer,
    dispatcher: ReplyDispatcher,
}

impl MessageRouter {
    pub fn new(
        cfg: RouterConfig,
        templates: Arc<PromptTemplates>,
        messenger: Arc<dyn MessagingPort>,
        completer: Completer,
        dispatcher: ReplyDispatcher,
    ) -> Self {
        Self {
            cfg,
            templates,
            messenger,
            completer,
            dispatcher,
        }
    }

    pub fn ignore_reason(&self, msg: &InboundMessage) -> Option<IgnoreReason> {
        match msg.origin {
            Origin::SelfBot => Some(IgnoreReason::OwnMessage),
            Origin::OtherBot if !self.cfg.respond_to_bots => Some(IgnoreReason::BotMessage),
            _ if msg.text.trim().is_empty() => Some(IgnoreReason::EmptyText),
            _ => None,
        }
    }

    pub async fn handle(&self, msg: InboundMessage) -> RouteOutcome {
        if let Some(reason) = self.ignore_reason(&msg) {
            tracing::debug!(channel = %msg.channel_id, ts = %msg.ts, ?reason, "ignoring message");
            return RouteOutcome::Ignored(reason);
        }

        let route = Route::classify(&msg);
        // Root of the thread the answer goes into.
        let thread_ts = match (&route, &msg.thread_ts) {
            (Route::Continuation, Some(root)) => root.clone(),
            _ => msg.ts.clone(),
        };
        tracing::info!(channel = %msg.channel_id, ts = %msg.ts, ?route, "handling message");

        let answer = match self.generate(route, &msg, &thread_ts).await {
            Ok(a) => a,
            Err(e) => {
                tracing::error!(
                    channel = %msg.channel_id,
                    ts = %msg.ts,
                    ?route,
                    error = %e,
                    "failed to generate answer"
                );
                let reported = self
                    .dispatcher
                    .report_failure(&msg.channel_id, &thread_ts, &e)
                    .await;
                return RouteOutcome::Failed { route, reported };
            }
        };

        let dispatch = match route {
            Route::NewTopic => {
                self.dispatcher
                    .reply_to_parent(&msg.channel_id, &msg.ts, &answer)
                    .await
            }
            Route::Continuation => {
                self.dispatcher
                    .reply_to_reply(&msg.channel_id, &thread_ts, &msg.ts, &answer)
                    .await
            }
        };

        RouteOutcome::Answered { route, dispatch }
    }

    async fn generate(
        &self,
        route: Route,
        msg: &InboundMessage,
        thread_ts: &MessageTs,
    ) -> Result<String> {
        let prompt = match route {
            Route::NewTopic => self.templates.new_topic(&msg.text),
            Route::Continuation => {
                let transcript =
                    fetch_transcript(self.messenger.as_ref(), &msg.channel_id, thread_ts)
                        .await?
                        .windowed(self.cfg.thread_history_limit);
                self.templates.continuation(&transcript)
            }
        };
        tracing::debug!(%prompt, "final prompt");

        let tag = user_tag(msg.author_id.as_ref().map(|u| u.as_str()).unwrap_or(""));
        let result = self.completer.complete(prompt, &tag).await?;
        if result.text.is_empty() {
            return Err(Error::External("completion was empty".to_string()));
        }
        Ok(result.text)
    }
}
