//! Core engine for an artifact-tracking AI chat application.
//!
//! The host UI owns conversations and persistence; this crate owns the hard
//! parts: provider routing with fallback, result merging, the OCR pipeline
//! and image normalization. Everything here is created per call and
//! discarded when the call returns.

pub mod config;
pub mod error;
pub mod imaging;
pub mod models;
pub mod ocr;
pub mod orchestrator;
pub mod providers;

pub use config::AppConfig;
pub use error::{EngineError, ProviderAttempt};
pub use models::{
    ChatTurn, EditedImage, EncodedImage, GenerationRequest, GenerationResult, ProviderReply, Role,
};
pub use orchestrator::Orchestrator;

/// Wire up env_logger. Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env().try_init();
}
