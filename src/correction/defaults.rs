// Centralized defaults for correction providers.
//
// These are used when the user has left a provider field blank. The base URL
// and model fallbacks mirror what each hosted service exposes through its
// OpenAI-compatible Chat Completions endpoint.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Local Ollama OpenAI-compatible endpoint
pub const DEFAULT_API_BASE: &str = "http://localhost:11434/v1";

/// Ollama ignores the key, but some proxies in front of it require one
pub const DEFAULT_API_KEY: &str = "ollama";

pub const DEFAULT_MODEL: &str = "gemma3";

/// Default timeout for correction requests
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a grammar and style fixer. Given the user's text, reply with ONLY a single JSON object (no other text, no markdown). Use this exact shape:
{"corrected": "<the corrected text>", "explanation": "<brief explanation of changes>"}
The "explanation" field may be null or a short string. Output nothing but valid JSON."#;

/// Kind of correction backend. All of them are reached through an
/// OpenAI-compatible Chat Completions API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Gemini,
    #[default]
    Ollama,
    /// Any other OpenAI-compatible server
    Custom,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Ollama => "ollama",
            ProviderKind::Custom => "custom",
        }
    }

    /// Base URL used when the settings leave it blank.
    pub fn default_api_base(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
            ProviderKind::Ollama | ProviderKind::Custom => DEFAULT_API_BASE,
        }
    }

    /// Classify a base URL.
    pub fn infer_from_base(base: &str) -> Self {
        if base.contains("api.openai.com") {
            ProviderKind::OpenAi
        } else if base.contains("generativelanguage.googleapis.com") {
            ProviderKind::Gemini
        } else if base.contains(":11434") || base.contains("ollama") {
            ProviderKind::Ollama
        } else {
            ProviderKind::Custom
        }
    }
}

/// Returns the default model id for a given base URL.
pub fn default_model_for_base(base: &str) -> &'static str {
    match ProviderKind::infer_from_base(base) {
        ProviderKind::OpenAi => "gpt-5-nano",
        ProviderKind::Gemini => "gemini-3-flash-preview",
        ProviderKind::Ollama | ProviderKind::Custom => DEFAULT_MODEL,
    }
}
