//! OpenAI-compatible chat completion client.
//!
//! Talks to a local Ollama server (or any endpoint speaking the same
//! `/chat/completions` dialect). The recommendation engine is the only
//! consumer; it treats the model as a stateless request/response oracle
//! and owns all parsing of the raw text that comes back.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::services::recommender::{CompletionModel, SamplingConfig};

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

#[derive(Clone)]
pub struct LlmClient {
    http_client: reqwest::Client,
    endpoint: String,
    model_id: String,
}

impl LlmClient {
    pub fn new(endpoint: String, model_id: String) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http_client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model_id,
        }
    }

    async fn chat(
        &self,
        system_instruction: &str,
        user_prompt: &str,
        sampling: SamplingConfig,
    ) -> AppResult<String> {
        let url = format!("{}/chat/completions", self.endpoint);
        let body = ChatRequest {
            model: self.model_id.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_instruction.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            temperature: sampling.temperature,
            max_tokens: sampling.max_output_tokens,
        };

        let response = self.http_client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Model endpoint returned status {}: {}",
                status, body
            )));
        }

        let chat: ChatResponse = response.json().await?;

        chat.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AppError::ExternalApi("Model returned no choices".to_string()))
    }
}

#[async_trait::async_trait]
impl CompletionModel for LlmClient {
    async fn complete(
        &self,
        system_instruction: &str,
        user_prompt: &str,
        sampling: SamplingConfig,
    ) -> AppResult<String> {
        self.chat(system_instruction, user_prompt, sampling).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let client = LlmClient::new(
            "http://localhost:11434/v1/".to_string(),
            "llama3".to_string(),
        );
        assert_eq!(client.endpoint, "http://localhost:11434/v1");
    }

    #[test]
    fn test_chat_response_deserialization() {
        let json = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "[\"Heat\"]"}}
            ]
        }"#;

        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.choices[0].message.content, "[\"Heat\"]");
    }
}
