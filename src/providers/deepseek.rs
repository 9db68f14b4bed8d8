use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::Provider;
use crate::config::AppConfig;
use crate::error::EngineError;
use crate::models::{GenerationRequest, ProviderReply};

const PROVIDER: &str = "deepseek";

#[derive(Debug, Serialize)]
struct DeepSeekRequest {
    model: String,
    messages: Vec<DeepSeekMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct DeepSeekMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct DeepSeekResponse {
    choices: Vec<DeepSeekChoice>,
}

#[derive(Debug, Deserialize)]
struct DeepSeekChoice {
    message: DeepSeekMessageResponse,
}

#[derive(Debug, Deserialize)]
struct DeepSeekMessageResponse {
    content: String,
}

/// Primary text-reasoning provider. Its conversational fluency is preferred
/// for chat text, so it sits first in the fallback chain.
pub struct DeepSeekClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl DeepSeekClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http: Client::new(),
            api_key: config.deepseek_api_key.clone(),
            base_url: config.deepseek_base_url.clone(),
            model: config.deepseek_model.clone(),
        }
    }

    fn build_messages(request: &GenerationRequest) -> Vec<DeepSeekMessage> {
        let mut messages = Vec::new();

        if !request.system_instruction.is_empty() {
            messages.push(DeepSeekMessage {
                role: "system".to_string(),
                content: request.system_instruction.clone(),
            });
        }

        for turn in &request.history {
            if turn.text.is_empty() {
                continue;
            }
            messages.push(DeepSeekMessage {
                role: turn.role.as_str().to_string(),
                content: turn.text.clone(),
            });
        }

        messages.push(DeepSeekMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        messages
    }
}

#[async_trait]
impl Provider for DeepSeekClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<ProviderReply, EngineError> {
        let wire = DeepSeekRequest {
            model: self.model.clone(),
            messages: Self::build_messages(request),
            max_tokens: 2048,
            temperature: 0.7,
            stream: false,
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

        let body: DeepSeekResponse = response.json().await.map_err(|e| EngineError::Other {
            operation: "deepseek::generate".to_string(),
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
