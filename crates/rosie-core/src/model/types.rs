use serde::{Deserialize, Serialize};

use crate::prompt::DELIMITER;

/// Fixed generation parameters. Only the prompt and user tag vary per request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub stop: String,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 256,
            temperature: 0.5,
            top_p: 1.0,
            stop: DELIMITER.to_string(),
        }
    }
}

/// Normalized request for a single completion.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    #[serde(flatten)]
    pub params: GenerationParams,
    /// Hashed author id, used upstream for abuse tracking.
    pub user: String,
}

/// One generated alternative.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionResult {
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_flat() {
        let req = CompletionRequest {
            model: "m".to_string(),
            prompt: "p".to_string(),
            params: GenerationParams::default(),
            user: "42".to_string(),
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["model"], "m");
        assert_eq!(v["max_tokens"], 256);
        assert_eq!(v["temperature"], 0.5);
        assert_eq!(v["top_p"], 1.0);
        assert_eq!(v["stop"], "###");
        assert_eq!(v["user"], "42");
    }
}
