//! OpenAI-compatible chat completions
//!
//! One implementation serves OpenAI, OpenRouter, Requesty and local servers
//! (LM Studio, llama.cpp, vLLM). They share the `/chat/completions` and
//! `/models` layout and differ in defaults and a few headers.

use super::{
    build_client, get_text, json_headers, post_json, CallOptions, LlmProvider, ModelInfo,
    ProviderConfig,
};
use crate::config::Settings;
use crate::error::ImportError;
use crate::logger::Logger;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Timeout for model listing and connection checks
const METADATA_TIMEOUT: Duration = Duration::from_secs(10);

/// Referer sent to OpenRouter for app attribution
const OPENROUTER_REFERER: &str = "https://github.com/everruns/notekit";

/// Which OpenAI-compatible service to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAiFlavor {
    OpenAi,
    OpenRouter,
    Requesty,
    Local,
}

impl OpenAiFlavor {
    pub fn name(&self) -> &'static str {
        match self {
            OpenAiFlavor::OpenAi => "openai",
            OpenAiFlavor::OpenRouter => "openrouter",
            OpenAiFlavor::Requesty => "requesty",
            OpenAiFlavor::Local => "local",
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            OpenAiFlavor::OpenAi => "https://api.openai.com/v1",
            OpenAiFlavor::OpenRouter => "https://openrouter.ai/api/v1",
            OpenAiFlavor::Requesty => "https://router.requesty.ai/v1",
            OpenAiFlavor::Local => "http://localhost:1234/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            OpenAiFlavor::OpenAi => "gpt-4o-mini",
            OpenAiFlavor::OpenRouter => "openai/gpt-4o-mini",
            OpenAiFlavor::Requesty => "openai/gpt-4o-mini",
            OpenAiFlavor::Local => "local-model",
        }
    }

    /// Shown when the service cannot list its models
    fn fallback_models(&self) -> Vec<ModelInfo> {
        match self {
            OpenAiFlavor::OpenAi => vec![
                ModelInfo::new("gpt-4o-mini", "GPT-4o mini"),
                ModelInfo::new("gpt-4o", "GPT-4o"),
                ModelInfo::new("gpt-4-turbo", "GPT-4 Turbo"),
                ModelInfo::new("gpt-3.5-turbo", "GPT-3.5 Turbo"),
            ],
            OpenAiFlavor::OpenRouter | OpenAiFlavor::Requesty => vec![
                ModelInfo::new("openai/gpt-4o-mini", "GPT-4o mini"),
                ModelInfo::new("openai/gpt-4o", "GPT-4o"),
                ModelInfo::new("anthropic/claude-3.5-sonnet", "Claude 3.5 Sonnet"),
                ModelInfo::new("google/gemini-flash-1.5", "Gemini 1.5 Flash"),
            ],
            OpenAiFlavor::Local => vec![ModelInfo::new("local-model", "Local model")],
        }
    }

    fn requires_api_key(&self) -> bool {
        !matches!(self, OpenAiFlavor::Local)
    }
}

/// `/models` response
#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

/// Provider for any OpenAI-compatible chat completions service
pub struct OpenAiCompatibleProvider {
    flavor: OpenAiFlavor,
    config: ProviderConfig,
    client: reqwest::Client,
    logger: Logger,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        flavor: OpenAiFlavor,
        config: ProviderConfig,
        logger: Logger,
    ) -> Result<Self, ImportError> {
        Ok(Self {
            flavor,
            config,
            client: build_client()?,
            logger,
        })
    }

    pub fn from_settings(
        flavor: OpenAiFlavor,
        settings: &Settings,
        logger: Logger,
    ) -> Result<Self, ImportError> {
        let config = ProviderConfig::from_settings(
            settings,
            flavor.default_endpoint(),
            flavor.default_model(),
        );
        Self::new(flavor, config, logger)
    }

    pub fn flavor(&self) -> OpenAiFlavor {
        self.flavor
    }

    /// Authorization plus flavor-specific headers
    fn base_headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = Vec::new();
        if !self.config.api_key.is_empty() {
            headers.push(("Authorization", format!("Bearer {}", self.config.api_key)));
        }
        if self.flavor == OpenAiFlavor::OpenRouter {
            headers.push(("HTTP-Referer", OPENROUTER_REFERER.to_string()));
            headers.push(("X-Title", "NoteKit".to_string()));
        }
        headers
    }

    async fn fetch_models(&self) -> Result<Vec<ModelInfo>, ImportError> {
        let url = format!("{}/models", self.config.endpoint.trim_end_matches('/'));
        let headers = json_headers(&self.base_headers(), &[])?;
        let (status, body) = get_text(
            &self.client,
            &url,
            headers,
            METADATA_TIMEOUT,
            &self.config.api_key,
        )
        .await?;
        if !(200..300).contains(&status) {
            return Err(super::http_error(self.name(), status, &body).redact(&self.config.api_key));
        }
        let list: ModelList = serde_json::from_str(&body)
            .map_err(|_| ImportError::InvalidResponseFormat(self.name().to_string()))?;
        Ok(list
            .data
            .into_iter()
            .map(|entry| {
                let name = entry.name.unwrap_or_else(|| entry.id.clone());
                ModelInfo::new(entry.id, name)
            })
            .collect())
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        self.flavor.name()
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn requires_api_key(&self) -> bool {
        self.flavor.requires_api_key()
    }

    fn requires_endpoint(&self) -> bool {
        true
    }

    async fn send_request(
        &self,
        prompt: &str,
        options: &CallOptions,
    ) -> Result<String, ImportError> {
        let call = self.config.resolve(options);
        let url = format!("{}/chat/completions", call.endpoint);
        let body = json!({
            "model": call.model,
            "messages": [
                {"role": "system", "content": call.system_prompt},
                {"role": "user", "content": prompt},
            ],
            "temperature": call.temperature,
            "max_tokens": call.max_tokens,
        });

        self.logger.debug(format!(
            "{}: POST {} (model {}, {} prompt chars)",
            self.name(),
            url,
            call.model,
            prompt.chars().count()
        ));

        let headers = json_headers(&self.base_headers(), call.extra_headers)?;
        post_json(
            &self.client,
            self.name(),
            &url,
            headers,
            &body,
            call.timeout,
            &self.config.api_key,
        )
        .await
    }

    async fn available_models(&self) -> Vec<ModelInfo> {
        match self.fetch_models().await {
            Ok(models) if !models.is_empty() => models,
            Ok(_) => self.flavor.fallback_models(),
            Err(e) => {
                self.logger
                    .warn(format!("{}: could not list models: {}", self.name(), e));
                self.flavor.fallback_models()
            }
        }
    }

    async fn validate_connection(&self) -> bool {
        match self.fetch_models().await {
            Ok(_) => true,
            Err(e) => {
                self.logger
                    .debug(format!("{}: connection check failed: {}", self.name(), e));
                false
            }
        }
    }
}
