use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::correction::{
    default_model_for_base, ProviderKind, DEFAULT_API_BASE, DEFAULT_API_KEY, DEFAULT_MODEL,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_SYSTEM_PROMPT,
};
use crate::shortcut::ShortcutBinding;

// ============================================================================
// SETTINGS FILE
// ============================================================================

pub const SETTINGS_FILENAME: &str = "settings.json";

/// Directory name under the platform config dir
pub const APP_DIR_NAME: &str = "help-me-write";

// ============================================================================
// ENVIRONMENT FALLBACKS - consulted only for fields left blank in settings
// ============================================================================

pub const ENV_API_BASE: &str = "OPENAI_API_BASE";
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_MODEL: &str = "OPENAI_MODEL";

// ============================================================================

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_api_key() -> String {
    DEFAULT_API_KEY.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

/// Accept any stored shortcut spelling; fall back to the default binding
/// rather than rejecting the whole settings file.
fn deserialize_shortcut_or_default<'de, D>(deserializer: D) -> Result<ShortcutBinding, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    let Some(raw) = value else {
        return Ok(ShortcutBinding::default());
    };
    match raw.parse::<ShortcutBinding>() {
        Ok(binding) => Ok(binding),
        Err(e) => {
            log::warn!("Invalid stored shortcut '{}': {}; using default", raw, e);
            Ok(ShortcutBinding::default())
        }
    }
}

/// Provider and shortcut settings as stored in `settings.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderSettings {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default, deserialize_with = "deserialize_shortcut_or_default")]
    pub shortcut: ShortcutBinding,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            api_base: default_api_base(),
            api_key: default_api_key(),
            model: default_model(),
            system_prompt: default_system_prompt(),
            shortcut: ShortcutBinding::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Provider settings with every blank field filled in
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProviderConfig {
    pub kind: ProviderKind,
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub system_prompt: String,
    pub timeout: Duration,
}

impl ProviderSettings {
    /// Resolve blank fields from the process environment, then defaults.
    pub fn resolve(&self) -> ResolvedProviderConfig {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolve blank fields using `env` as the environment lookup.
    pub fn resolve_with<F>(&self, env: F) -> ResolvedProviderConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let from_env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let api_base = match self.api_base.trim() {
            "" => from_env(ENV_API_BASE)
                .unwrap_or_else(|| self.provider.default_api_base().to_string()),
            base => base.to_string(),
        };

        let kind = match self.provider {
            ProviderKind::Custom => ProviderKind::infer_from_base(&api_base),
            kind => kind,
        };

        let api_key = if self.api_key.is_empty() {
            from_env(ENV_API_KEY).unwrap_or_else(|| match kind {
                ProviderKind::Ollama => DEFAULT_API_KEY.to_string(),
                _ => String::new(),
            })
        } else {
            self.api_key.clone()
        };

        let model = match self.model.trim() {
            "" => from_env(ENV_MODEL)
                .unwrap_or_else(|| default_model_for_base(&api_base).to_string()),
            model => model.to_string(),
        };

        let system_prompt = match self.system_prompt.trim() {
            "" => DEFAULT_SYSTEM_PROMPT.to_string(),
            _ => self.system_prompt.clone(),
        };

        let timeout = match self.timeout_secs {
            0 => DEFAULT_REQUEST_TIMEOUT,
            secs => Duration::from_secs(secs),
        };

        ResolvedProviderConfig {
            kind,
            api_base,
            api_key,
            model,
            system_prompt,
            timeout,
        }
    }
}

/// Errors from reading or writing the settings file
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("No configuration directory available on this platform")]
    NoConfigDir,
}

/// Loads and saves [`ProviderSettings`] as pretty-printed JSON
#[derive(Debug, Clone)]
pub struct SettingsStore {
    file_path: PathBuf,
}

impl SettingsStore {
    /// Create a store for `settings.json` inside `dir`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            file_path: dir.as_ref().join(SETTINGS_FILENAME),
        }
    }

    /// Store in the platform config directory
    pub fn default_location() -> Result<Self, SettingsError> {
        let dir = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
        Ok(Self::new(dir.join(APP_DIR_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Load settings. A missing file yields defaults; so does a corrupt one,
    /// with a warning, so the app stays usable.
    pub fn load(&self) -> Result<ProviderSettings, SettingsError> {
        let content = match fs::read_to_string(&self.file_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No settings at {}; using defaults", self.file_path.display());
                return Ok(ProviderSettings::default());
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&content) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                log::warn!(
                    "Failed to parse {}: {}; using defaults",
                    self.file_path.display(),
                    e
                );
                Ok(ProviderSettings::default())
            }
        }
    }

    /// Write settings, creating the directory if needed
    pub fn save(&self, settings: &ProviderSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.file_path, content)?;
        log::info!("Settings saved to {}", self.file_path.display());
        Ok(())
    }

    /// Persist a newly recorded shortcut, leaving every other field untouched
    pub fn save_shortcut(&self, binding: ShortcutBinding) -> Result<ProviderSettings, SettingsError> {
        let mut settings = self.load()?;
        settings.shortcut = binding;
        self.save(&settings)?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = ProviderSettings::default();
        assert_eq!(settings.api_base, "http://localhost:11434/v1");
        assert_eq!(settings.api_key, "ollama");
        assert_eq!(settings.model, "gemma3");
        assert_eq!(settings.shortcut.to_string(), "Ctrl+Alt+Shift+G");
        assert_eq!(settings.timeout_secs, 60);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: ProviderSettings =
            serde_json::from_str(r#"{"api_base": "https://api.openai.com/v1"}"#).unwrap();
        assert_eq!(settings.api_base, "https://api.openai.com/v1");
        assert_eq!(settings.model, "gemma3");
        assert_eq!(settings.shortcut, ShortcutBinding::default());
    }

    #[test]
    fn test_invalid_shortcut_falls_back() {
        let settings: ProviderSettings =
            serde_json::from_str(r#"{"model": "m", "shortcut": "Ctrl+Shift"}"#).unwrap();
        assert_eq!(settings.model, "m");
        assert_eq!(settings.shortcut, ShortcutBinding::default());

        let settings: ProviderSettings =
            serde_json::from_str(r#"{"shortcut": "shift+ctrl+space"}"#).unwrap();
        assert_eq!(settings.shortcut.to_string(), "Ctrl+Shift+Space");
    }

    #[test]
    fn test_resolve_keeps_explicit_values() {
        let settings = ProviderSettings {
            provider: ProviderKind::OpenAi,
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: "sk-abc".to_string(),
            model: "gpt-4o-mini".to_string(),
            ..Default::default()
        };
        let resolved = settings.resolve_with(env_of(&[(ENV_MODEL, "ignored")]));
        assert_eq!(resolved.kind, ProviderKind::OpenAi);
        assert_eq!(resolved.api_key, "sk-abc");
        assert_eq!(resolved.model, "gpt-4o-mini");
        assert_eq!(resolved.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_resolve_blank_fields_from_env() {
        let settings = ProviderSettings {
            provider: ProviderKind::Custom,
            api_base: String::new(),
            api_key: String::new(),
            model: String::new(),
            system_prompt: " ".to_string(),
            ..Default::default()
        };
        let resolved = settings.resolve_with(env_of(&[
            (ENV_API_BASE, "https://api.openai.com/v1"),
            (ENV_API_KEY, "sk-env"),
        ]));
        assert_eq!(resolved.api_base, "https://api.openai.com/v1");
        assert_eq!(resolved.kind, ProviderKind::OpenAi);
        assert_eq!(resolved.api_key, "sk-env");
        assert_eq!(resolved.model, "gpt-5-nano");
        assert_eq!(resolved.system_prompt, DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn test_resolve_blank_fields_without_env() {
        let settings = ProviderSettings {
            provider: ProviderKind::Gemini,
            api_base: String::new(),
            api_key: String::new(),
            model: String::new(),
            timeout_secs: 0,
            ..Default::default()
        };
        let resolved = settings.resolve_with(env_of(&[]));
        assert_eq!(
            resolved.api_base,
            "https://generativelanguage.googleapis.com/v1beta/openai"
        );
        assert_eq!(resolved.model, "gemini-3-flash-preview");
        assert!(resolved.api_key.is_empty());
        assert_eq!(resolved.timeout, DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn test_store_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path());
        assert_eq!(store.load().unwrap(), ProviderSettings::default());
    }

    #[test]
    fn test_store_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("nested"));
        let settings = ProviderSettings {
            model: "llama3.2".to_string(),
            shortcut: "Ctrl+Shift+Space".parse().unwrap(),
            ..Default::default()
        };
        store.save(&settings).unwrap();
        assert_eq!(store.load().unwrap(), settings);

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"shortcut\": \"Ctrl+Shift+Space\""));
    }

    #[test]
    fn test_store_corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path());
        fs::write(store.path(), "{ not json").unwrap();
        assert_eq!(store.load().unwrap(), ProviderSettings::default());
    }

    #[test]
    fn test_save_shortcut_preserves_other_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path());
        let settings = ProviderSettings {
            api_key: "secret".to_string(),
            ..Default::default()
        };
        store.save(&settings).unwrap();

        let updated = store.save_shortcut("Alt+F9".parse().unwrap()).unwrap();
        assert_eq!(updated.api_key, "secret");
        assert_eq!(store.load().unwrap().shortcut.to_string(), "Alt+F9");
    }
}
