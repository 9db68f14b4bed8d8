use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::EngineError;

/// Engine configuration. Loaded from an optional JSON file, then overridden
/// by environment variables so keys never need to live on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub deepseek_api_key: String,
    pub deepseek_base_url: String,
    pub deepseek_model: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
            gemini_model: "gemini-2.0-flash".to_string(),
            deepseek_api_key: String::new(),
            deepseek_base_url: "https://api.deepseek.com".to_string(),
            deepseek_model: "deepseek-chat".to_string(),
            openai_api_key: String::new(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-4o-mini".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load(dir: &Path) -> Self {
        let config_path = dir.join("config.json");
        let mut config = if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
                Err(_) => Self::default(),
            }
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config
    }

    /// Load from the platform config directory (`<config>/atelier`).
    pub fn load_default() -> Self {
        match dirs::config_dir() {
            Some(base) => Self::load(&base.join("atelier")),
            None => {
                let mut config = Self::default();
                config.apply_env_overrides();
                config
            }
        }
    }

    pub fn save(&self, dir: &Path) {
        let config_path = dir.join("config.json");
        if let Ok(content) = serde_json::to_string_pretty(self) {
            std::fs::write(config_path, content).ok();
        }
    }

    fn apply_env_overrides(&mut self) {
        let overrides: [(&str, &mut String); 6] = [
            ("GEMINI_API_KEY", &mut self.gemini_api_key),
            ("GEMINI_BASE_URL", &mut self.gemini_base_url),
            ("DEEPSEEK_API_KEY", &mut self.deepseek_api_key),
            ("DEEPSEEK_BASE_URL", &mut self.deepseek_base_url),
            ("OPENAI_API_KEY", &mut self.openai_api_key),
            ("OPENAI_BASE_URL", &mut self.openai_base_url),
        ];
        for (var, slot) in overrides {
            if let Ok(value) = std::env::var(var) {
                if !value.is_empty() {
                    *slot = value;
                }
            }
        }
    }

    /// Startup validation: at least one provider must have credentials.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.gemini_api_key.is_empty()
            && self.deepseek_api_key.is_empty()
            && self.openai_api_key.is_empty()
        {
            return Err(EngineError::NoCredentials);
        }
        Ok(())
    }
}
