use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// An opaque encoded image: base64 payload plus its MIME type tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    pub mime_type: String,
    pub data: String,
}

/// One entry of a conversation. Immutable once appended; owned by the
/// host application, this crate only reads it as request context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
    #[serde(default)]
    pub images: Vec<EncodedImage>,
    pub created_at: String,
}

impl ChatTurn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            images: Vec::new(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Everything a single user turn needs. Built fresh per turn, never shared.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub images: Vec<EncodedImage>,
    pub previous_artifact: String,
    pub system_instruction: String,
    pub model: String,
    pub history: Vec<ChatTurn>,
}

impl GenerationRequest {
    pub fn text_only(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            images: Vec::new(),
            previous_artifact: String::new(),
            system_instruction: String::new(),
            model: String::new(),
            history: Vec::new(),
        }
    }

    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }
}

/// What a provider client hands back from `generate`. `artifact` is `None`
/// when the provider said nothing about the artifact panel; the orchestrator
/// decides what that means.
#[derive(Debug, Clone)]
pub struct ProviderReply {
    pub text: String,
    pub artifact: Option<String>,
}

/// The resolved outcome of a turn. Invariant: when the provider returned an
/// empty or missing artifact, `artifact_content` equals the request's
/// `previous_artifact` exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub chat_response: String,
    pub artifact_content: String,
}

/// Result of an image-edit call; the provider may return text, a new image,
/// or both.
#[derive(Debug, Clone)]
pub struct EditedImage {
    pub text: Option<String>,
    pub image: Option<EncodedImage>,
}
