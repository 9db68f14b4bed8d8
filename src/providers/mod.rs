pub mod deepseek;
pub mod gemini;
pub mod openai;

use async_trait::async_trait;

use crate::error::EngineError;
use crate::models::{EditedImage, EncodedImage, GenerationRequest, ProviderReply};

pub use deepseek::DeepSeekClient;
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

/// One upstream inference service. Every implementor owns its own wire
/// schema translation and classifies its own failures; nothing escapes a
/// client as an unclassified error.
///
/// Only the multimodal provider implements the image and OCR capabilities;
/// the text-reasoning providers keep the default "not supported" bodies.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, request: &GenerationRequest) -> Result<ProviderReply, EngineError>;

    async fn generate_image(&self, _prompt: &str) -> Result<EncodedImage, EngineError> {
        Err(self.unsupported("generate_image"))
    }

    async fn edit_image(
        &self,
        _prompt: &str,
        _image: &EncodedImage,
    ) -> Result<EditedImage, EngineError> {
        Err(self.unsupported("edit_image"))
    }

    /// Batched raw text extraction over one or more images, deterministic
    /// (minimum temperature). An empty `Ok` string means the provider
    /// finished normally without finding text.
    async fn extract_text(
        &self,
        _images: &[EncodedImage],
        _instruction: &str,
    ) -> Result<String, EngineError> {
        Err(self.unsupported("extract_text"))
    }

    /// Short plain-text completion used for conversation titles and the
    /// OCR organize pass.
    async fn complete(&self, _prompt: &str, _temperature: f32) -> Result<String, EngineError> {
        Err(self.unsupported("complete"))
    }

    fn unsupported(&self, operation: &str) -> EngineError {
        EngineError::Other {
            operation: format!("{}::{}", self.name(), operation),
            detail: "not supported by this provider".to_string(),
        }
    }
}
