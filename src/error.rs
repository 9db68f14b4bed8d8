use thiserror::Error;

/// A single failed provider attempt, kept for fallback diagnostics within
/// one orchestration call. Never persisted.
#[derive(Debug, Clone)]
pub struct ProviderAttempt {
    pub provider: &'static str,
    pub detail: String,
}

impl std::fmt::Display for ProviderAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.provider, self.detail)
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("image encoding produced no data: {0}")]
    Encode(String),

    #[error("{provider} returned a response without the expected shape: {detail}")]
    InvalidResponseShape {
        provider: &'static str,
        detail: String,
    },

    #[error("{provider} blocked the request ({reason})")]
    ContentBlocked {
        provider: &'static str,
        reason: String,
    },

    #[error("{provider} stopped generating early ({reason})")]
    IncompleteGeneration {
        provider: &'static str,
        reason: String,
    },

    #[error("{provider} is unavailable: {detail}")]
    ProviderUnavailable {
        provider: &'static str,
        detail: String,
    },

    #[error("{provider} quota exceeded")]
    QuotaExceeded { provider: &'static str },

    #[error("all reasoning providers failed ({})", format_attempts(.attempts))]
    AllProvidersExhausted { attempts: Vec<ProviderAttempt> },

    #[error("no provider credentials configured")]
    NoCredentials,

    #[error("{operation} failed: {detail}")]
    Other { operation: String, detail: String },
}

fn format_attempts(attempts: &[ProviderAttempt]) -> String {
    attempts
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl EngineError {
    /// Classify an HTTP error status from a provider endpoint.
    pub fn from_status(
        provider: &'static str,
        operation: &str,
        status: reqwest::StatusCode,
        body: String,
    ) -> Self {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            EngineError::QuotaExceeded { provider }
        } else if status.is_server_error() {
            EngineError::ProviderUnavailable {
                provider,
                detail: format!("{}: {}", status, body),
            }
        } else {
            EngineError::Other {
                operation: operation.to_string(),
                detail: format!("{}: {}", status, body),
            }
        }
    }

    /// Classify a transport-level failure (connection refused, DNS, TLS).
    pub fn from_transport(provider: &'static str, err: reqwest::Error) -> Self {
        EngineError::ProviderUnavailable {
            provider,
            detail: err.to_string(),
        }
    }

    /// Safety blocks and malformed output mean the request itself is
    /// unsuitable, so the fallback chain must not retry another provider.
    pub fn aborts_fallback(&self) -> bool {
        matches!(
            self,
            EngineError::ContentBlocked { .. } | EngineError::InvalidResponseShape { .. }
        )
    }

    /// Plain-language line the host appends to a conversation when a turn
    /// fails. The conversation is never left silently unresponsive.
    pub fn user_message(&self) -> String {
        match self {
            EngineError::ContentBlocked { .. } => {
                "The request was blocked by the provider's safety filters. \
                 Try rephrasing your message."
                    .to_string()
            }
            EngineError::QuotaExceeded { provider } => {
                format!("The {} API quota has been exhausted. Please try again later.", provider)
            }
            EngineError::AllProvidersExhausted { .. } => {
                "All AI providers are currently unreachable. \
                 Please check your connection and API keys, then try again."
                    .to_string()
            }
            EngineError::NoCredentials => {
                "No API keys are configured. Add at least one provider key to get started."
                    .to_string()
            }
            other => format!("Something went wrong while generating a reply: {}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_429_maps_to_quota() {
        let err = EngineError::from_status(
            "gemini",
            "generate",
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            String::new(),
        );
        assert!(matches!(err, EngineError::QuotaExceeded { provider: "gemini" }));
    }

    #[test]
    fn status_5xx_maps_to_unavailable() {
        let err = EngineError::from_status(
            "deepseek",
            "generate",
            reqwest::StatusCode::SERVICE_UNAVAILABLE,
            "down".to_string(),
        );
        assert!(matches!(err, EngineError::ProviderUnavailable { .. }));
    }

    #[test]
    fn blocked_and_malformed_abort_fallback() {
        let blocked = EngineError::ContentBlocked {
            provider: "gemini",
            reason: "SAFETY".to_string(),
        };
        let malformed = EngineError::InvalidResponseShape {
            provider: "gemini",
            detail: "not an object".to_string(),
        };
        let transient = EngineError::ProviderUnavailable {
            provider: "deepseek",
            detail: "503".to_string(),
        };
        assert!(blocked.aborts_fallback());
        assert!(malformed.aborts_fallback());
        assert!(!transient.aborts_fallback());
    }

    #[test]
    fn every_error_has_a_user_message() {
        let err = EngineError::AllProvidersExhausted {
            attempts: vec![ProviderAttempt {
                provider: "deepseek",
                detail: "503".to_string(),
            }],
        };
        assert!(!err.user_message().is_empty());
    }
}
