use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::Provider;
use crate::config::AppConfig;
use crate::error::EngineError;
use crate::models::{GenerationRequest, ProviderReply};

const PROVIDER: &str = "openai";

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessageResponse,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessageResponse {
    content: String,
}

/// Fallback text-reasoning provider. Conversational turns only; image and
/// artifact work stays on the multimodal provider.
pub struct OpenAiClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http: Client::new(),
            api_key: config.openai_api_key.clone(),
            base_url: config.openai_base_url.clone(),
            model: config.openai_model.clone(),
        }
    }

    fn build_messages(request: &GenerationRequest) -> Vec<OpenAiMessage> {
        let mut messages = Vec::new();

        if !request.system_instruction.is_empty() {
            messages.push(OpenAiMessage {
                role: "system".to_string(),
                content: request.system_instruction.clone(),
            });
        }

        for turn in &request.history {
            if turn.text.is_empty() {
                continue;
            }
            messages.push(OpenAiMessage {
                role: turn.role.as_str().to_string(),
                content: turn.text.clone(),
            });
        }

        messages.push(OpenAiMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        messages
    }
}

#[async_trait]
impl Provider for OpenAiClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<ProviderReply, EngineError> {
        let wire = OpenAiRequest {
            model: self.model.clone(),
            messages: Self::build_messages(request),
            max_tokens: 2048,
            temperature: 0.7,
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&wire)
            .send()
            .await
            .map_err(|e| EngineError::from_transport(PROVIDER, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::from_status(PROVIDER, "generate", status, body));
        }

        let body: OpenAiResponse = response.json().await.map_err(|e| EngineError::Other {
            operation: "openai::generate".to_string(),
            detail: format!("failed to parse response: {}", e),
        })?;

        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| EngineError::InvalidResponseShape {
                provider: PROVIDER,
                detail: "response carried no choices".to_string(),
            })?;

        Ok(ProviderReply {
            text: content,
            artifact: None,
        })
    }
}
