//! OpenAI-compatible Chat Completions correction provider.
//!
//! Works against OpenAI, Gemini's OpenAI endpoint, Ollama's `/v1` API and any
//! other server exposing `POST {base}/chat/completions`.

use super::defaults::{
    default_model_for_base, ProviderKind, DEFAULT_API_BASE, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_SYSTEM_PROMPT,
};
use super::{Correction, CorrectionProvider, ProviderError};
use crate::settings::ResolvedProviderConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Explanation shown when the model did not return the expected JSON shape
const UNPARSED_EXPLANATION: &str = "Could not parse explanation.";

pub struct ChatCompletionsProvider {
    client: Client,
    kind: ProviderKind,
    base_url: String,
    api_key: String,
    model: String,
    system_prompt: String,
    timeout: Option<Duration>,
}

impl ChatCompletionsProvider {
    /// Create a provider for the given base URL, using the default model for it
    pub fn new(base_url: String, api_key: String) -> Self {
        let model = default_model_for_base(&base_url).to_string();
        Self {
            client: Client::new(),
            kind: ProviderKind::infer_from_base(&base_url),
            base_url,
            api_key,
            model,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            timeout: Some(DEFAULT_REQUEST_TIMEOUT),
        }
    }

    /// Create with a specific model
    pub fn with_model(base_url: String, api_key: String, model: String) -> Self {
        Self {
            model,
            ..Self::new(base_url, api_key)
        }
    }

    /// Create from resolved settings
    pub fn from_config(config: &ResolvedProviderConfig) -> Self {
        Self::with_model(
            config.api_base.clone(),
            config.api_key.clone(),
            config.model.clone(),
        )
        .with_kind(config.kind)
        .with_system_prompt(config.system_prompt.clone())
        .with_timeout(config.timeout)
    }

    pub fn with_kind(mut self, kind: ProviderKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: String) -> Self {
        self.system_prompt = system_prompt;
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Disable request timeouts entirely.
    ///
    /// This is primarily intended for the settings surface "Test" action.
    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    fn endpoint(&self) -> String {
        let base = self.base_url.trim();
        let base = if base.is_empty() { DEFAULT_API_BASE } else { base };
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }

    async fn complete(&self, user_message: String) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: self.system_prompt.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_message,
                },
            ],
        };

        let url = self.endpoint();
        log::debug!("{}: POST {} (model {})", self.kind.as_str(), url, self.model);

        let mut req = self.client.post(&url).json(&request);
        if !self.api_key.is_empty() {
            req = req.bearer_auth(&self.api_key);
        }
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }

        let response = req.send().await.map_err(|e| match self.timeout {
            Some(timeout) if e.is_timeout() => ProviderError::Timeout(timeout),
            _ => ProviderError::Network(e),
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&error_text) {
                return Err(ProviderError::Api(format!(
                    "API error {}: {}",
                    status, error_response.error.message
                )));
            }
            return Err(ProviderError::Api(format!(
                "API error {}: {}",
                status, error_text
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                ProviderError::InvalidResponse("API returned no choices or content".to_string())
            })
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// The JSON shape the system prompt asks the model for
#[derive(Debug, Deserialize)]
struct CorrectionReply {
    corrected: String,
    explanation: Option<String>,
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    match rest.trim().strip_suffix("```") {
        Some(inner) => inner.trim(),
        None => trimmed,
    }
}

/// Split a model reply into corrected text and explanation.
///
/// Replies that are not the expected JSON object are used verbatim as the
/// correction.
pub fn parse_correction_content(content: &str) -> (String, Option<String>) {
    let content = content.trim();
    match serde_json::from_str::<CorrectionReply>(strip_code_fence(content)) {
        Ok(reply) => (
            reply.corrected,
            reply.explanation.filter(|e| !e.trim().is_empty()),
        ),
        Err(_) => (content.to_string(), Some(UNPARSED_EXPLANATION.to_string())),
    }
}

#[async_trait]
impl CorrectionProvider for ChatCompletionsProvider {
    async fn correct(&self, text: &str) -> Result<Correction, ProviderError> {
        let user_message = format!("Fix the grammar and style of this text:\n\n{}", text);
        let content = self.complete(user_message).await?;
        let (corrected, explanation) = parse_correction_content(&content);

        Ok(Correction {
            original: text.to_string(),
            corrected,
            explanation,
        })
    }

    fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_defaults_from_base() {
        let provider =
            ChatCompletionsProvider::new("https://api.openai.com/v1".to_string(), "k".to_string());
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.model(), "gpt-5-nano");
        assert_eq!(provider.timeout, Some(DEFAULT_REQUEST_TIMEOUT));
    }

    #[test]
    fn test_custom_model() {
        let provider = ChatCompletionsProvider::with_model(
            DEFAULT_API_BASE.to_string(),
            String::new(),
            "llama3.2".to_string(),
        );
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.model(), "llama3.2");
    }

    #[test]
    fn test_without_timeout_disables_timeout() {
        let provider =
            ChatCompletionsProvider::new(DEFAULT_API_BASE.to_string(), String::new()).without_timeout();
        assert!(provider.timeout.is_none());
    }

    #[test]
    fn test_from_config_applies_every_field() {
        let config = ResolvedProviderConfig {
            kind: ProviderKind::Custom,
            api_base: "http://10.0.0.5:8080/v1".to_string(),
            api_key: String::new(),
            model: "qwen2.5".to_string(),
            system_prompt: "Only fix spelling.".to_string(),
            timeout: Duration::from_secs(15),
        };
        let provider = ChatCompletionsProvider::from_config(&config);
        assert_eq!(provider.name(), "custom");
        assert_eq!(provider.model(), "qwen2.5");
        assert_eq!(provider.system_prompt, "Only fix spelling.");
        assert_eq!(provider.timeout, Some(Duration::from_secs(15)));
        assert_eq!(provider.endpoint(), "http://10.0.0.5:8080/v1/chat/completions");
    }

    #[test]
    fn test_endpoint_joins_base() {
        let provider =
            ChatCompletionsProvider::new("http://localhost:11434/v1/".to_string(), String::new());
        assert_eq!(provider.endpoint(), "http://localhost:11434/v1/chat/completions");

        let provider = ChatCompletionsProvider::new("  ".to_string(), String::new());
        assert_eq!(provider.endpoint(), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn test_parse_json_reply() {
        let (corrected, explanation) = parse_correction_content(
            r#"{"corrected": "I have an apple.", "explanation": "Fixed verb agreement."}"#,
        );
        assert_eq!(corrected, "I have an apple.");
        assert_eq!(explanation.as_deref(), Some("Fixed verb agreement."));
    }

    #[test]
    fn test_parse_json_reply_without_explanation() {
        let (corrected, explanation) =
            parse_correction_content(r#"{"corrected": "Done.", "explanation": null}"#);
        assert_eq!(corrected, "Done.");
        assert!(explanation.is_none());

        let (_, explanation) = parse_correction_content(r#"{"corrected": "Done."}"#);
        assert!(explanation.is_none());
    }

    #[test]
    fn test_parse_fenced_reply() {
        let (corrected, _) =
            parse_correction_content("```json\n{\"corrected\": \"Fenced.\"}\n```");
        assert_eq!(corrected, "Fenced.");
    }

    #[test]
    fn test_parse_plain_text_reply() {
        let (corrected, explanation) = parse_correction_content("  Just the text.  ");
        assert_eq!(corrected, "Just the text.");
        assert_eq!(explanation.as_deref(), Some(UNPARSED_EXPLANATION));
    }
}
