//! Correction providers.
//!
//! A provider takes the user's source text and returns a corrected version plus
//! an optional explanation. Every supported backend speaks the OpenAI-compatible
//! Chat Completions API, so one implementation covers OpenAI, Gemini, Ollama and
//! self-hosted servers; the trait exists so the session driver can be exercised
//! with other backends and with fakes.

mod chat;
mod defaults;

pub use chat::{parse_correction_content, ChatCompletionsProvider};
pub use defaults::{
    default_model_for_base, ProviderKind, DEFAULT_API_BASE, DEFAULT_API_KEY, DEFAULT_MODEL,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_SYSTEM_PROMPT,
};

use crate::settings::ResolvedProviderConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Errors that can occur while requesting a correction
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{0}")]
    Api(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Nothing to correct: input is empty")]
    EmptyInput,
}

/// Result of a correction request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    pub original: String,
    pub corrected: String,
    pub explanation: Option<String>,
}

/// Trait for services that can correct text
#[async_trait]
pub trait CorrectionProvider: Send + Sync {
    /// Correct the given text
    async fn correct(&self, text: &str) -> Result<Correction, ProviderError>;

    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Get the current model being used
    fn model(&self) -> &str;
}

/// Correct text with a provider, rejecting blank input locally.
pub async fn correct_text(
    provider: &dyn CorrectionProvider,
    text: &str,
) -> Result<Correction, ProviderError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ProviderError::EmptyInput);
    }
    provider.correct(text).await
}

/// Build the provider described by resolved settings.
pub fn create_provider(config: &ResolvedProviderConfig) -> Arc<dyn CorrectionProvider> {
    Arc::new(ChatCompletionsProvider::from_config(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoProvider;

    #[async_trait]
    impl CorrectionProvider for EchoProvider {
        async fn correct(&self, text: &str) -> Result<Correction, ProviderError> {
            Ok(Correction {
                original: text.to_string(),
                corrected: text.to_uppercase(),
                explanation: None,
            })
        }

        fn name(&self) -> &'static str {
            "echo"
        }

        fn model(&self) -> &str {
            "none"
        }
    }

    #[tokio::test]
    async fn test_correct_text_rejects_blank_input() {
        let result = correct_text(&EchoProvider, "  \n ").await;
        assert!(matches!(result, Err(ProviderError::EmptyInput)));
    }

    #[tokio::test]
    async fn test_correct_text_trims_before_sending() {
        let correction = correct_text(&EchoProvider, "  abc ").await.unwrap();
        assert_eq!(correction.original, "abc");
        assert_eq!(correction.corrected, "ABC");
    }

    #[test]
    fn test_create_provider_uses_config() {
        let config = ResolvedProviderConfig {
            kind: ProviderKind::OpenAi,
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: "sk-test".to_string(),
            model: "gpt-5-nano".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        };
        let provider = create_provider(&config);
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.model(), "gpt-5-nano");
    }
}
