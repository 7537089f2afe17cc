use std::{sync::Arc, time::Duration};

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use rosie_core::{
    config::Config, dispatch::ReplyDispatcher, model::client::Completer, router::MessageRouter,
};
use rosie_openai::OpenAiClient;
use rosie_slack::{api::SlackApiClient, EventHandler, SlackMessenger};

const SLACK_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rosie_core::logging::init("rosie")?;

    let cfg = Arc::new(Config::load()?);
    tracing::info!(
        env = ?cfg.env_mode,
        connection = ?cfg.connection_mode,
        model = %cfg.openai_model,
        "starting {}",
        cfg.bot_name
    );

    let api = SlackApiClient::new(
        cfg.slack_api_base.clone(),
        cfg.slack_bot_token.clone(),
        cfg.slack_app_token.clone(),
        SLACK_HTTP_TIMEOUT,
    )?;
    let identity = Arc::new(
        api.auth_test()
            .await
            .context("slack auth.test failed; check the bot token")?,
    );
    tracing::info!(
        user_id = %identity.user_id,
        bot_id = ?identity.bot_id,
        "slack identity resolved"
    );

    let messenger = Arc::new(SlackMessenger::new(api.clone(), identity.clone()));
    let model = Arc::new(OpenAiClient::new(
        cfg.openai_api_key.clone(),
        cfg.openai_base_url.clone(),
        cfg.openai_timeout,
    )?);

    let router = MessageRouter::new(
        cfg.router_config(),
        Arc::new(cfg.prompt.clone()),
        messenger.clone(),
        Completer::new(model, cfg.openai_model.clone()),
        ReplyDispatcher::new(messenger, cfg.bot_name.clone()),
    );
    let handler = EventHandler::new(Arc::new(router), identity);

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("shutdown signal received");
                on_signal.cancel();
            }
            Err(e) => tracing::error!(error = %e, "failed to listen for shutdown signal"),
        }
    });

    rosie_slack::run(cfg, api, handler, shutdown).await
}
