use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    errors::Error,
    model::types::{Candidate, CompletionRequest, CompletionResult, GenerationParams},
    Result,
};

/// Provider port for text completion (OpenAI today).
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send one request and return every candidate the provider produced.
    async fn create_completion(&self, req: &CompletionRequest) -> Result<Vec<Candidate>>;
}

/// Completion service used by the router: fixed parameters, first candidate, trimmed.
#[derive(Clone)]
pub struct Completer {
    client: Arc<dyn CompletionClient>,
    model: String,
    params: GenerationParams,
}

impl Completer {
    pub fn new(client: Arc<dyn CompletionClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            params: GenerationParams::default(),
        }
    }

    pub async fn complete(&self, prompt: String, user_tag: &str) -> Result<CompletionResult> {
        let req = CompletionRequest {
            model: self.model.clone(),
            prompt,
            params: self.params.clone(),
            user: user_tag.to_string(),
        };

        let candidates = self.client.create_completion(&req).await?;
        let first = candidates.into_iter().next().ok_or(Error::NoCandidates)?;

        Ok(CompletionResult {
            text: first.text.trim().to_string(),
        })
    }
}
