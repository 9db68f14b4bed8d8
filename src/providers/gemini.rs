use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::Provider;
use crate::config::AppConfig;
use crate::error::EngineError;
use crate::models::{EditedImage, EncodedImage, GenerationRequest, ProviderReply, Role};

const PROVIDER: &str = "gemini";
const IMAGE_MODEL: &str = "gemini-2.0-flash-exp-image-generation";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// The two named fields the structured chat contract asks for.
#[derive(Debug, Deserialize)]
struct StructuredReply {
    response: String,
    #[serde(default)]
    artifact: Option<String>,
}

/// The multimodal provider. Handles image-bearing chat turns, structured
/// artifact output, image generation/editing and raw OCR extraction.
pub struct GeminiClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http: Client::new(),
            api_key: config.gemini_api_key.clone(),
            base_url: config.gemini_base_url.clone(),
            model: config.gemini_model.clone(),
        }
    }

    async fn call(
        &self,
        model: &str,
        operation: &str,
        request: &GeminiRequest,
    ) -> Result<GeminiResponse, EngineError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            model,
            self.api_key
        );

        let response = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| EngineError::from_transport(PROVIDER, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::from_status(PROVIDER, operation, status, body));
        }

        response.json().await.map_err(|e| EngineError::Other {
            operation: operation.to_string(),
            detail: format!("failed to parse response: {}", e),
        })
    }

    fn user_content(text: &str, images: &[EncodedImage]) -> Content {
        let mut parts = vec![Part {
            text: Some(text.to_string()),
            inline_data: None,
        }];
        for img in images {
            parts.push(Part {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: img.mime_type.clone(),
                    data: img.data.clone(),
                }),
            });
        }
        Content {
            role: Some("user".to_string()),
            parts,
        }
    }

    fn history_contents(request: &GenerationRequest) -> Vec<Content> {
        request
            .history
            .iter()
            .filter(|turn| !turn.text.is_empty())
            .map(|turn| Content {
                role: Some(
                    match turn.role {
                        Role::User => "user",
                        Role::Assistant => "model",
                    }
                    .to_string(),
                ),
                parts: vec![Part {
                    text: Some(turn.text.clone()),
                    inline_data: None,
                }],
            })
            .collect()
    }

    fn system_instruction(text: &str) -> Option<Content> {
        if text.is_empty() {
            return None;
        }
        Some(Content {
            role: None,
            parts: vec![Part {
                text: Some(text.to_string()),
                inline_data: None,
            }],
        })
    }

    /// Pull the reply out of a response, classifying safety blocks and
    /// truncated generations along the way. Returns the concatenated text
    /// parts and any inline image.
    fn read_reply(
        response: GeminiResponse,
        operation: &str,
    ) -> Result<(String, Option<EncodedImage>), EngineError> {
        if let Some(feedback) = &response.prompt_feedback {
            if let Some(reason) = &feedback.block_reason {
                return Err(EngineError::ContentBlocked {
                    provider: PROVIDER,
                    reason: reason.clone(),
                });
            }
        }

        let candidate = response.candidates.into_iter().next();
        let finish_reason = candidate
            .as_ref()
            .and_then(|c| c.finish_reason.clone())
            .unwrap_or_default();

        let mut text = String::new();
        let mut image = None;
        if let Some(content) = candidate.and_then(|c| c.content) {
            for part in content.parts {
                if let Some(t) = part.text {
                    text.push_str(&t);
                }
                if let Some(inline) = part.inline_data {
                    image = Some(EncodedImage {
                        mime_type: inline.mime_type,
                        data: inline.data,
                    });
                }
            }
        }

        if text.is_empty() && image.is_none() {
            if finish_reason.eq_ignore_ascii_case("SAFETY")
                || finish_reason.eq_ignore_ascii_case("PROHIBITED_CONTENT")
            {
                return Err(EngineError::ContentBlocked {
                    provider: PROVIDER,
                    reason: finish_reason,
                });
            }
            if !finish_reason.is_empty() && !finish_reason.eq_ignore_ascii_case("STOP") {
                return Err(EngineError::IncompleteGeneration {
                    provider: PROVIDER,
                    reason: finish_reason,
                });
            }
            log::info!("gemini {} finished normally with empty output", operation);
        }

        Ok((text, image))
    }
}

fn artifact_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "response": { "type": "STRING" },
            "artifact": { "type": "STRING" }
        },
        "required": ["response"]
    })
}

#[async_trait]
impl Provider for GeminiClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<ProviderReply, EngineError> {
        let model = if request.model.is_empty() {
            &self.model
        } else {
            &request.model
        };

        let mut contents = Self::history_contents(request);
        contents.push(Self::user_content(&request.prompt, &request.images));

        let mut instruction = request.system_instruction.clone();
        if !request.previous_artifact.is_empty() {
            instruction.push_str(
                "\n\nThe user maintains a side artifact (code or document). \
                 Its current content is below. Return the full updated artifact \
                 in the \"artifact\" field when the request calls for a change; \
                 otherwise leave the field out.\n\n",
            );
            instruction.push_str(&request.previous_artifact);
        }

        let wire = GeminiRequest {
            contents,
            system_instruction: Self::system_instruction(&instruction),
            generation_config: Some(GenerationConfig {
                temperature: 0.7,
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(artifact_schema()),
                response_modalities: None,
            }),
        };

        let response = self.call(model, "generate", &wire).await?;
        let (text, _) = Self::read_reply(response, "generate")?;

        // The structured contract demands a single JSON object; anything
        // without the delimiters is malformed output, not a transient fault.
        let trimmed = text.trim();
        if !trimmed.starts_with('{') || !trimmed.ends_with('}') {
            return Err(EngineError::InvalidResponseShape {
                provider: PROVIDER,
                detail: format!(
                    "expected a JSON object, got {} chars starting with {:?}",
                    trimmed.len(),
                    trimmed.chars().take(12).collect::<String>()
                ),
            });
        }

        let parsed: StructuredReply =
            serde_json::from_str(trimmed).map_err(|e| EngineError::InvalidResponseShape {
                provider: PROVIDER,
                detail: e.to_string(),
            })?;

        Ok(ProviderReply {
            text: parsed.response,
            artifact: parsed.artifact,
        })
    }

    async fn generate_image(&self, prompt: &str) -> Result<EncodedImage, EngineError> {
        let wire = GeminiRequest {
            contents: vec![Self::user_content(prompt, &[])],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                temperature: 0.9,
                response_mime_type: None,
                response_schema: None,
                response_modalities: Some(vec!["IMAGE".to_string(), "TEXT".to_string()]),
            }),
        };

        let response = self.call(IMAGE_MODEL, "generate_image", &wire).await?;
        let (_, image) = Self::read_reply(response, "generate_image")?;
        image.ok_or_else(|| EngineError::InvalidResponseShape {
            provider: PROVIDER,
            detail: "no image part in response".to_string(),
        })
    }

    async fn edit_image(
        &self,
        prompt: &str,
        image: &EncodedImage,
    ) -> Result<EditedImage, EngineError> {
        let wire = GeminiRequest {
            contents: vec![Self::user_content(prompt, std::slice::from_ref(image))],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                temperature: 0.9,
                response_mime_type: None,
                response_schema: None,
                response_modalities: Some(vec!["IMAGE".to_string(), "TEXT".to_string()]),
            }),
        };

        let response = self.call(IMAGE_MODEL, "edit_image", &wire).await?;
        let (text, edited) = Self::read_reply(response, "edit_image")?;

        if text.is_empty() && edited.is_none() {
            return Err(EngineError::InvalidResponseShape {
                provider: PROVIDER,
                detail: "response carried neither text nor image".to_string(),
            });
        }

        Ok(EditedImage {
            text: if text.is_empty() { None } else { Some(text) },
            image: edited,
        })
    }

    async fn extract_text(
        &self,
        images: &[EncodedImage],
        instruction: &str,
    ) -> Result<String, EngineError> {
        let wire = GeminiRequest {
            contents: vec![Self::user_content(instruction, images)],
            system_instruction: None,
            // Deterministic: transcription must not paraphrase.
            generation_config: Some(GenerationConfig {
                temperature: 0.0,
                response_mime_type: None,
                response_schema: None,
                response_modalities: None,
            }),
        };

        let response = self.call(&self.model, "extract_text", &wire).await?;
        let (text, _) = Self::read_reply(response, "extract_text")?;
        Ok(text)
    }

    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, EngineError> {
        let wire = GeminiRequest {
            contents: vec![Self::user_content(prompt, &[])],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                temperature,
                response_mime_type: None,
                response_schema: None,
                response_modalities: None,
            }),
        };

        let response = self.call(&self.model, "complete", &wire).await?;
        let (text, _) = Self::read_reply(response, "complete")?;
        Ok(text.trim().to_string())
    }
}
