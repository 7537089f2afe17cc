//! OpenAI adapter (text completions).
//!
//! Implements the `rosie-core` `CompletionClient` port over the
//! `POST /completions` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use rosie_core::{
    errors::Error,
    model::{
        client::CompletionClient,
        types::{Candidate, CompletionRequest},
    },
    Result,
};

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Candidate>,
}

#[derive(Clone, Debug)]
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("openai client build failed: {e}")))?;
        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn create_completion(&self, req: &CompletionRequest) -> Result<Vec<Candidate>> {
        let resp = self
            .http
            .post(format!("{}/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(req)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("openai request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Transport(format!(
                "openai completion failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let parsed: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| Error::Transport(format!("openai json error: {e}")))?;

        tracing::debug!(
            model = %req.model,
            candidates = parsed.choices.len(),
            "openai completion received"
        );

        Ok(parsed.choices)
    }
}
