//! Ollama `/api/generate`
//!
//! The completion endpoint takes a single prompt, so the system prompt is
//! prepended to the user prompt.

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

/// Default server address
pub const OLLAMA_DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default model
pub const OLLAMA_DEFAULT_MODEL: &str = "llama3.1";

const METADATA_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct TagList {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// Ollama provider; no credential required
pub struct OllamaProvider {
    config: ProviderConfig,
    client: reqwest::Client,
    logger: Logger,
}

impl OllamaProvider {
    pub fn new(config: ProviderConfig, logger: Logger) -> Result<Self, ImportError> {
        Ok(Self {
            config,
            client: build_client()?,
            logger,
        })
    }

    pub fn from_settings(settings: &Settings, logger: Logger) -> Result<Self, ImportError> {
        let config =
            ProviderConfig::from_settings(settings, OLLAMA_DEFAULT_ENDPOINT, OLLAMA_DEFAULT_MODEL);
        Self::new(config, logger)
    }

    fn endpoint(&self) -> &str {
        self.config.endpoint.trim_end_matches('/')
    }

    async fn get(&self, path: &str) -> Result<String, ImportError> {
        let url = format!("{}{}", self.endpoint(), path);
        let (status, body) = get_text(
            &self.client,
            &url,
            json_headers(&[], &[])?,
            METADATA_TIMEOUT,
            &self.config.api_key,
        )
        .await?;
        if !(200..300).contains(&status) {
            return Err(super::http_error(self.name(), status, &body));
        }
        Ok(body)
    }

    fn fallback_models() -> Vec<ModelInfo> {
        vec![
            ModelInfo::new("llama3.1", "Llama 3.1"),
            ModelInfo::new("mistral", "Mistral"),
            ModelInfo::new("qwen2.5", "Qwen 2.5"),
        ]
    }
}

/// Single prompt for the completion endpoint
fn combined_prompt(system_prompt: &str, prompt: &str) -> String {
    if system_prompt.trim().is_empty() {
        prompt.to_string()
    } else {
        format!("{system_prompt}\n\n{prompt}")
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn requires_api_key(&self) -> bool {
        false
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
        let url = format!("{}/api/generate", call.endpoint);
        let body = json!({
            "model": call.model,
            "prompt": combined_prompt(call.system_prompt, prompt),
            "stream": false,
            "options": {
                "temperature": call.temperature,
                "num_predict": call.max_tokens,
            },
        });

        self.logger.debug(format!("ollama: POST {} (model {})", url, call.model));

        let headers = json_headers(&[], call.extra_headers)?;
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
        let listed = self.get("/api/tags").await.and_then(|body| {
            serde_json::from_str::<TagList>(&body)
                .map_err(|_| ImportError::InvalidResponseFormat(self.name().to_string()))
        });
        match listed {
            Ok(list) if !list.models.is_empty() => list
                .models
                .into_iter()
                .map(|tag| ModelInfo::new(tag.name.clone(), tag.name))
                .collect(),
            Ok(_) => Self::fallback_models(),
            Err(e) => {
                self.logger
                    .warn(format!("ollama: could not list models: {}", e));
                Self::fallback_models()
            }
        }
    }

    async fn validate_connection(&self) -> bool {
        self.get("/api/version").await.is_ok()
    }
}
