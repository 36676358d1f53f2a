//! Settings read from the host application
//!
//! The host persists one settings object (as JSON, camelCase keys). NoteKit
//! only reads it; loading and saving stay with the host.

use crate::error::ImportError;
use crate::redact::REDACTED;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Default output folder for imported notes
pub const DEFAULT_OUTPUT_FOLDER: &str = "Imports";

/// Default request timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default cap on generated tokens
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Placeholder a custom prompt template must contain
pub const CONTENT_PLACEHOLDER: &str = "{{content}}";

/// LLM backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI chat completions
    #[default]
    OpenAi,
    /// OpenRouter (OpenAI-compatible)
    OpenRouter,
    /// Requesty router (OpenAI-compatible)
    Requesty,
    /// Google Gemini
    Gemini,
    /// Ollama completion endpoint
    Ollama,
    /// Local OpenAI-compatible server (LM Studio and friends)
    Local,
}

impl ProviderKind {
    /// All variants, in display order
    pub const ALL: [ProviderKind; 6] = [
        ProviderKind::OpenAi,
        ProviderKind::OpenRouter,
        ProviderKind::Requesty,
        ProviderKind::Gemini,
        ProviderKind::Ollama,
        ProviderKind::Local,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::Requesty => "requesty",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Ollama => "ollama",
            ProviderKind::Local => "local",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lower)
            .ok_or_else(|| {
                format!(
                    "Invalid provider: must be one of {}",
                    ProviderKind::ALL.map(|k| k.as_str()).join(", ")
                )
            })
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plugin settings as stored by the host
#[derive(Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Which LLM backend to call
    pub provider: ProviderKind,

    /// Credential for the backend (may be empty for local backends)
    pub api_key: String,

    /// Endpoint override; each provider has its own default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Model override; each provider has its own default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Root folder for imported notes
    pub default_output_folder: String,

    /// Replaces the generic handler's prompt; must contain `{{content}}`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_template_override: Option<String>,

    /// System prompt override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Verbose diagnostic logging
    pub debug: bool,

    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,

    /// Sampling temperature
    pub temperature: f32,

    /// Cap on generated tokens
    pub max_tokens: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            api_key: String::new(),
            endpoint: None,
            model: None,
            default_output_folder: DEFAULT_OUTPUT_FOLDER.to_string(),
            prompt_template_override: None,
            system_prompt: None,
            debug: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let api_key = if self.api_key.is_empty() { "" } else { REDACTED };
        f.debug_struct("Settings")
            .field("provider", &self.provider)
            .field("api_key", &api_key)
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("default_output_folder", &self.default_output_folder)
            .field("prompt_template_override", &self.prompt_template_override)
            .field("system_prompt", &self.system_prompt)
            .field("debug", &self.debug)
            .field("timeout_ms", &self.timeout_ms)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Settings {
    /// Parse settings from the host's JSON; missing keys take defaults
    pub fn from_json_str(json: &str) -> Result<Self, ImportError> {
        serde_json::from_str(json).map_err(|e| ImportError::Config(format!("Invalid settings: {e}")))
    }

    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Endpoint override, ignoring blank values
    pub fn endpoint_override(&self) -> Option<&str> {
        self.endpoint
            .as_deref()
            .map(str::trim)
            .filter(|endpoint| !endpoint.is_empty())
    }

    /// Model override, ignoring blank values
    pub fn model_override(&self) -> Option<&str> {
        self.model
            .as_deref()
            .map(str::trim)
            .filter(|model| !model.is_empty())
    }

    /// Check value ranges and formats
    pub fn validate(&self) -> Result<(), ImportError> {
        if self.timeout_ms == 0 {
            return Err(ImportError::Config("timeoutMs must be positive".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ImportError::Config(
                "temperature must be between 0 and 2".to_string(),
            ));
        }
        if self.max_tokens == 0 {
            return Err(ImportError::Config("maxTokens must be positive".to_string()));
        }
        if let Some(endpoint) = self.endpoint_override() {
            let parsed = Url::parse(endpoint)
                .map_err(|e| ImportError::Config(format!("Invalid endpoint: {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ImportError::Config(
                    "Invalid endpoint: must start with http:// or https://".to_string(),
                ));
            }
        }
        if let Some(template) = &self.prompt_template_override {
            if !template.trim().is_empty() && !template.contains(CONTENT_PLACEHOLDER) {
                return Err(ImportError::Config(format!(
                    "promptTemplateOverride must contain {CONTENT_PLACEHOLDER}"
                )));
            }
        }
        Ok(())
    }

    /// JSON schema of the settings object, for the host's settings UI
    pub fn json_schema() -> serde_json::Value {
        let schema = schemars::schema_for!(Settings);
        serde_json::to_value(schema).unwrap_or_default()
    }
}
