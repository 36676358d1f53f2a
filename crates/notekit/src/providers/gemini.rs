//! Google Gemini `generateContent`

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

/// Default API root
pub const GEMINI_DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Timeout for model listing and connection checks
const METADATA_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiModelList {
    #[serde(default)]
    models: Vec<GeminiModel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiModel {
    name: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

/// Gemini provider; the key travels in the `x-goog-api-key` header
pub struct GeminiProvider {
    config: ProviderConfig,
    client: reqwest::Client,
    logger: Logger,
}

impl GeminiProvider {
    pub fn new(config: ProviderConfig, logger: Logger) -> Result<Self, ImportError> {
        Ok(Self {
            config,
            client: build_client()?,
            logger,
        })
    }

    pub fn from_settings(settings: &Settings, logger: Logger) -> Result<Self, ImportError> {
        let config =
            ProviderConfig::from_settings(settings, GEMINI_DEFAULT_ENDPOINT, GEMINI_DEFAULT_MODEL);
        Self::new(config, logger)
    }

    fn key_header(&self) -> Vec<(&'static str, String)> {
        vec![("x-goog-api-key", self.config.api_key.clone())]
    }

    async fn fetch_models(&self) -> Result<Vec<ModelInfo>, ImportError> {
        let url = format!("{}/models", self.config.endpoint.trim_end_matches('/'));
        let headers = json_headers(&self.key_header(), &[])?;
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
        let list: GeminiModelList = serde_json::from_str(&body)
            .map_err(|_| ImportError::InvalidResponseFormat(self.name().to_string()))?;
        Ok(list
            .models
            .into_iter()
            .filter(|model| {
                model.supported_generation_methods.is_empty()
                    || model
                        .supported_generation_methods
                        .iter()
                        .any(|m| m == "generateContent")
            })
            .map(|model| {
                let id = model
                    .name
                    .strip_prefix("models/")
                    .unwrap_or(&model.name)
                    .to_string();
                let name = model.display_name.unwrap_or_else(|| id.clone());
                ModelInfo::new(id, name)
            })
            .collect())
    }

    fn fallback_models() -> Vec<ModelInfo> {
        vec![
            ModelInfo::new("gemini-1.5-flash", "Gemini 1.5 Flash"),
            ModelInfo::new("gemini-1.5-pro", "Gemini 1.5 Pro"),
            ModelInfo::new("gemini-2.0-flash", "Gemini 2.0 Flash"),
        ]
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn requires_api_key(&self) -> bool {
        true
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
        let url = format!("{}/models/{}:generateContent", call.endpoint, call.model);
        let body = json!({
            "systemInstruction": {"parts": [{"text": call.system_prompt}]},
            "contents": [{"role": "user", "parts": [{"text": prompt}]}],
            "generationConfig": {
                "temperature": call.temperature,
                "maxOutputTokens": call.max_tokens,
            },
        });

        self.logger.debug(format!(
            "gemini: POST {} ({} prompt chars)",
            url,
            prompt.chars().count()
        ));

        let headers = json_headers(&self.key_header(), call.extra_headers)?;
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
            Ok(_) => Self::fallback_models(),
            Err(e) => {
                self.logger
                    .warn(format!("gemini: could not list models: {}", e));
                Self::fallback_models()
            }
        }
    }

    async fn validate_connection(&self) -> bool {
        self.fetch_models().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let provider = GeminiProvider::from_settings(
            &Settings {
                api_key: "g".to_string(),
                ..Default::default()
            },
            Logger::default(),
        )
        .unwrap();
        assert_eq!(provider.config().endpoint, GEMINI_DEFAULT_ENDPOINT);
        assert_eq!(provider.config().model, GEMINI_DEFAULT_MODEL);
        assert_eq!(provider.key_header(), vec![("x-goog-api-key", "g".to_string())]);
    }

    #[test]
    fn test_model_list_parsing() {
        let list: GeminiModelList = serde_json::from_str(
            r#"{"models": [
                {"name": "models/gemini-1.5-pro", "displayName": "Gemini 1.5 Pro", "supportedGenerationMethods": ["generateContent"]},
                {"name": "models/embedding-001", "supportedGenerationMethods": ["embedContent"]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(list.models.len(), 2);
        assert_eq!(list.models[0].display_name.as_deref(), Some("Gemini 1.5 Pro"));
    }
}
