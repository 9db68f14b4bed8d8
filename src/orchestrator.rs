use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::{EngineError, ProviderAttempt};
use crate::models::{EditedImage, EncodedImage, GenerationRequest, GenerationResult, ProviderReply};
use crate::ocr::OcrPipeline;
use crate::providers::{DeepSeekClient, GeminiClient, OpenAiClient, Provider};

/// Verbs that usually mean the user wants the artifact panel updated.
/// Deliberately coarse: a rephrased modification request can slip past it.
static ARTIFACT_INTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(create|generate|write|build|make|code|component|implement)\b")
        .expect("artifact intent regex")
});

/// Korean stems for the same intent; no word boundaries in Korean, so a
/// plain substring check is the right tool.
const ARTIFACT_INTENT_KO: &[&str] = &["만들", "생성", "작성", "코드", "컴포넌트", "구현", "짜줘"];

/// Routes each user turn to the right provider(s), merges partial results
/// and runs the fallback chain. One instance serves the whole app; every
/// call operates only on its own request.
pub struct Orchestrator {
    multimodal: Arc<dyn Provider>,
    reasoning: Vec<Arc<dyn Provider>>,
}

impl Orchestrator {
    /// Build real clients from configuration. Fails fast when no provider
    /// has credentials; reasoning providers without a key are skipped.
    pub fn from_config(config: &AppConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let multimodal: Arc<dyn Provider> = Arc::new(GeminiClient::new(config));
        let mut reasoning: Vec<Arc<dyn Provider>> = Vec::new();
        if !config.deepseek_api_key.is_empty() {
            reasoning.push(Arc::new(DeepSeekClient::new(config)));
        }
        if !config.openai_api_key.is_empty() {
            reasoning.push(Arc::new(OpenAiClient::new(config)));
        }

        log::info!(
            "orchestrator ready: multimodal={}, reasoning chain={:?}",
            multimodal.name(),
            reasoning.iter().map(|p| p.name()).collect::<Vec<_>>()
        );

        Ok(Self {
            multimodal,
            reasoning,
        })
    }

    /// Inject provider doubles. This is the test seam; production code goes
    /// through `from_config`.
    pub fn with_providers(
        multimodal: Arc<dyn Provider>,
        reasoning: Vec<Arc<dyn Provider>>,
    ) -> Self {
        Self {
            multimodal,
            reasoning,
        }
    }

    /// Resolve one user turn.
    ///
    /// Image-bearing requests go to the multimodal provider exclusively, no
    /// fallback. Text-only requests walk the reasoning chain in order, then
    /// optionally issue one secondary multimodal call when the prompt looks
    /// like it wants the artifact updated.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, EngineError> {
        if request.has_images() {
            log::info!(
                "routing image-bearing turn ({} image(s)) to {}",
                request.images.len(),
                self.multimodal.name()
            );
            let reply = self.multimodal.generate(request).await?;
            return Ok(resolve(request, reply));
        }

        // Keyless setups with only the multimodal provider still get text
        // turns answered; it becomes a reasoning chain of one.
        let chain: &[Arc<dyn Provider>] = if self.reasoning.is_empty() {
            std::slice::from_ref(&self.multimodal)
        } else {
            &self.reasoning
        };

        let mut attempts: Vec<ProviderAttempt> = Vec::new();
        for provider in chain {
            match provider.generate(request).await {
                Ok(reply) => {
                    log::info!("turn resolved by {}", provider.name());
                    let had_artifact = reply.artifact.is_some();
                    let mut result = resolve(request, reply);
                    if !had_artifact && wants_artifact(&request.prompt) {
                        self.refresh_artifact(request, &mut result).await;
                    }
                    return Ok(result);
                }
                Err(e) if e.aborts_fallback() => return Err(e),
                Err(e) => {
                    log::warn!("{} failed, trying next provider: {}", provider.name(), e);
                    attempts.push(ProviderAttempt {
                        provider: provider.name(),
                        detail: e.to_string(),
                    });
                }
            }
        }

        Err(EngineError::AllProvidersExhausted { attempts })
    }

    /// Secondary artifact call: bare context (prompt + previous artifact
    /// only), merged so chat text keeps the reasoning provider's fluency.
    /// Failure here degrades silently; the turn already has its reply.
    async fn refresh_artifact(&self, request: &GenerationRequest, result: &mut GenerationResult) {
        let bare = GenerationRequest {
            prompt: request.prompt.clone(),
            images: Vec::new(),
            previous_artifact: request.previous_artifact.clone(),
            system_instruction: request.system_instruction.clone(),
            model: String::new(),
            history: Vec::new(),
        };

        match self.multimodal.generate(&bare).await {
            Ok(reply) => {
                if let Some(artifact) = reply.artifact {
                    if !artifact.is_empty() {
                        log::info!("artifact refreshed by {}", self.multimodal.name());
                        result.artifact_content = artifact;
                    }
                }
            }
            Err(e) => {
                log::warn!("artifact call failed, keeping previous artifact: {}", e);
            }
        }
    }

    pub async fn generate_image(&self, prompt: &str) -> Result<EncodedImage, EngineError> {
        self.multimodal.generate_image(prompt).await
    }

    pub async fn edit_image(
        &self,
        prompt: &str,
        image: &EncodedImage,
    ) -> Result<EditedImage, EngineError> {
        self.multimodal.edit_image(prompt, image).await
    }

    pub async fn perform_ocr(&self, images: &[EncodedImage]) -> Result<String, EngineError> {
        OcrPipeline::new(self.multimodal.as_ref()).run(images).await
    }

    /// Name a new conversation from its first message. Best effort: any
    /// provider failure falls back to a deterministic prompt prefix.
    pub async fn generate_title(&self, prompt: &str, image: Option<&EncodedImage>) -> String {
        let instruction = format!(
            "Give this conversation a short title, five words or fewer, no quotes, \
             in the language of the message:\n\n{}",
            prompt
        );

        let attempt = match image {
            Some(img) => {
                self.multimodal
                    .extract_text(std::slice::from_ref(img), &instruction)
                    .await
            }
            None => self.multimodal.complete(&instruction, 0.3).await,
        };

        match attempt {
            Ok(title) if !title.trim().is_empty() => {
                title.lines().next().unwrap_or_default().trim().trim_matches('"').to_string()
            }
            Ok(_) => fallback_title(prompt),
            Err(e) => {
                log::warn!("title generation failed, using prompt prefix: {}", e);
                fallback_title(prompt)
            }
        }
    }
}

/// Enforce the artifact preservation contract: an empty or missing artifact
/// from the provider means "no change", never an overwrite.
fn resolve(request: &GenerationRequest, reply: ProviderReply) -> GenerationResult {
    let artifact_content = reply
        .artifact
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| request.previous_artifact.clone());

    GenerationResult {
        chat_response: reply.text,
        artifact_content,
    }
}

pub(crate) fn wants_artifact(prompt: &str) -> bool {
    ARTIFACT_INTENT.is_match(prompt)
        || ARTIFACT_INTENT_KO.iter().any(|stem| prompt.contains(stem))
}

fn fallback_title(prompt: &str) -> String {
    let words: Vec<&str> = prompt.split_whitespace().take(5).collect();
    if words.is_empty() {
        return "New conversation".to_string();
    }
    format!("{}…", words.join(" "))
}
