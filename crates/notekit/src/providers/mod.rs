//! LLM provider system
//!
//! Design: each backend implements [`LlmProvider::send_request`] as a single
//! attempt. The provided [`LlmProvider::call_llm`] wraps that attempt in the
//! shared retry policy and redacts the credential from whatever error
//! survives. Backends differ only in endpoint layout, request body and
//! model-listing format; the HTTP round trip and response normalization are
//! shared.

mod gemini;
mod ollama;
mod openai;
mod response;

pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
pub use openai::{OpenAiCompatibleProvider, OpenAiFlavor};
pub use response::extract_response_text;

use crate::config::{ProviderKind, Settings};
use crate::error::ImportError;
use crate::logger::Logger;
use crate::redact::{redact_api_key, REDACTED};
use crate::retry::{is_transient_error, retry_with_exponential_backoff, RetryPolicy};
use crate::DEFAULT_USER_AGENT;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default system prompt sent with every extraction request
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant that extracts structured information from web content. When asked for JSON, respond with valid JSON only.";

/// Cap on how much of an error body is echoed into error messages
const MAX_ERROR_BODY_CHARS: usize = 500;

/// A model offered by a backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
}

impl ModelInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Per-call overrides of the provider's defaults
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout: Option<Duration>,
    pub extra_headers: Vec<(String, String)>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }
}

/// Instance defaults shared by every backend
#[derive(Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: String::new(),
            model: String::new(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: crate::config::DEFAULT_TEMPERATURE,
            max_tokens: crate::config::DEFAULT_MAX_TOKENS,
            timeout: Duration::from_millis(crate::config::DEFAULT_TIMEOUT_MS),
            retry: RetryPolicy::default(),
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let api_key = if self.api_key.is_empty() { "" } else { REDACTED };
        f.debug_struct("ProviderConfig")
            .field("api_key", &api_key)
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ProviderConfig {
    /// Build from host settings, filling in the backend's defaults
    pub fn from_settings(settings: &Settings, default_endpoint: &str, default_model: &str) -> Self {
        Self {
            api_key: settings.api_key.trim().to_string(),
            endpoint: settings
                .endpoint_override()
                .unwrap_or(default_endpoint)
                .to_string(),
            model: settings.model_override().unwrap_or(default_model).to_string(),
            system_prompt: settings
                .system_prompt
                .clone()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            timeout: settings.timeout(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Merge per-call overrides over instance defaults
    pub fn resolve<'a>(&'a self, options: &'a CallOptions) -> ResolvedCall<'a> {
        ResolvedCall {
            model: options.model.as_deref().unwrap_or(&self.model),
            endpoint: options
                .endpoint
                .as_deref()
                .unwrap_or(&self.endpoint)
                .trim_end_matches('/'),
            system_prompt: options
                .system_prompt
                .as_deref()
                .unwrap_or(&self.system_prompt),
            temperature: options.temperature.unwrap_or(self.temperature),
            max_tokens: options.max_tokens.unwrap_or(self.max_tokens),
            timeout: options.timeout.unwrap_or(self.timeout),
            extra_headers: &options.extra_headers,
        }
    }

    /// Scrub the credential from a message
    pub fn redact(&self, text: &str) -> String {
        redact_api_key(text, &self.api_key)
    }
}

/// Effective parameters for one request
#[derive(Debug, Clone, Copy)]
pub struct ResolvedCall<'a> {
    pub model: &'a str,
    pub endpoint: &'a str,
    pub system_prompt: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub extra_headers: &'a [(String, String)],
}

/// A text-generation backend
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Backend name (for logging and model pickers)
    fn name(&self) -> &str;

    /// Instance defaults
    fn config(&self) -> &ProviderConfig;

    /// Whether a credential must be configured
    fn requires_api_key(&self) -> bool;

    /// Whether an endpoint must be configured
    fn requires_endpoint(&self) -> bool;

    /// One request attempt, no retries
    async fn send_request(&self, prompt: &str, options: &CallOptions)
        -> Result<String, ImportError>;

    /// Models offered by the backend; falls back to a fixed list on any failure
    async fn available_models(&self) -> Vec<ModelInfo>;

    /// Lightweight reachability and credential check; never errors
    async fn validate_connection(&self) -> bool;

    /// Send `prompt` with retries on transient failures
    async fn call_llm(&self, prompt: &str, options: &CallOptions) -> Result<String, ImportError> {
        let config = self.config();
        retry_with_exponential_backoff(
            &config.retry,
            || self.send_request(prompt, options),
            is_transient_error,
        )
        .await
        .map_err(|exhausted| {
            ImportError::LlmCallFailed {
                attempts: exhausted.attempts,
                source: Box::new(exhausted.error),
            }
            .redact(&config.api_key)
        })
    }
}

/// Create the provider selected in `settings`
pub fn create_provider(
    settings: &Settings,
    logger: Logger,
) -> Result<Arc<dyn LlmProvider>, ImportError> {
    let provider: Arc<dyn LlmProvider> = match settings.provider {
        ProviderKind::OpenAi => Arc::new(OpenAiCompatibleProvider::from_settings(
            OpenAiFlavor::OpenAi,
            settings,
            logger,
        )?),
        ProviderKind::OpenRouter => Arc::new(OpenAiCompatibleProvider::from_settings(
            OpenAiFlavor::OpenRouter,
            settings,
            logger,
        )?),
        ProviderKind::Requesty => Arc::new(OpenAiCompatibleProvider::from_settings(
            OpenAiFlavor::Requesty,
            settings,
            logger,
        )?),
        ProviderKind::Local => Arc::new(OpenAiCompatibleProvider::from_settings(
            OpenAiFlavor::Local,
            settings,
            logger,
        )?),
        ProviderKind::Gemini => Arc::new(GeminiProvider::from_settings(settings, logger)?),
        ProviderKind::Ollama => Arc::new(OllamaProvider::from_settings(settings, logger)?),
    };

    let config = provider.config();
    if provider.requires_api_key() && config.api_key.is_empty() {
        return Err(ImportError::Config(format!(
            "An API key is required for the {} provider",
            provider.name()
        )));
    }
    if provider.requires_endpoint() && config.endpoint.is_empty() {
        return Err(ImportError::Config(format!(
            "An endpoint is required for the {} provider",
            provider.name()
        )));
    }

    Ok(provider)
}

/// Shared reqwest client for provider calls
pub(crate) fn build_client() -> Result<reqwest::Client, ImportError> {
    reqwest::Client::builder()
        .user_agent(DEFAULT_USER_AGENT)
        .build()
        .map_err(|e| ImportError::Config(format!("Failed to create HTTP client: {e}")))
}

/// JSON content type plus caller-supplied headers
pub(crate) fn json_headers(
    base: &[(&str, String)],
    extra: &[(String, String)],
) -> Result<HeaderMap, ImportError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let pairs = base
        .iter()
        .map(|(name, value)| (*name, value.as_str()))
        .chain(extra.iter().map(|(name, value)| (name.as_str(), value.as_str())));
    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ImportError::Config(format!("Invalid header name: {name}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| ImportError::Config(format!("Invalid value for header {name}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// POST `body` to `url` racing `timeout`, and normalize the reply to text
///
/// Every error message leaving this function is redacted with `secret`.
pub(crate) async fn post_json(
    client: &reqwest::Client,
    provider: &str,
    url: &str,
    headers: HeaderMap,
    body: &serde_json::Value,
    timeout: Duration,
    secret: &str,
) -> Result<String, ImportError> {
    let round_trip = async {
        let response = client
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(ImportError::from_reqwest)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(ImportError::from_reqwest)?;
        Ok::<_, ImportError>((status, text))
    };

    let (status, text) = match tokio::time::timeout(timeout, round_trip).await {
        Ok(result) => result.map_err(|e| e.redact(secret))?,
        Err(_) => {
            return Err(ImportError::Timeout(format!(
                "{} did not respond within {}ms",
                provider,
                timeout.as_millis()
            ))
            .redact(secret))
        }
    };

    if !(200..300).contains(&status) {
        return Err(http_error(provider, status, &text).redact(secret));
    }

    extract_response_text(provider, &text)
}

/// GET `url` with a timeout, returning status and body
pub(crate) async fn get_text(
    client: &reqwest::Client,
    url: &str,
    headers: HeaderMap,
    timeout: Duration,
    secret: &str,
) -> Result<(u16, String), ImportError> {
    let round_trip = async {
        let response = client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(ImportError::from_reqwest)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(ImportError::from_reqwest)?;
        Ok::<_, ImportError>((status, text))
    };

    match tokio::time::timeout(timeout, round_trip).await {
        Ok(result) => result.map_err(|e| e.redact(secret)),
        Err(_) => Err(ImportError::Timeout(format!(
            "GET {} did not complete within {}ms",
            url,
            timeout.as_millis()
        ))
        .redact(secret)),
    }
}

/// Build an HTTP error, preferring the nested `error.message` of the body
pub(crate) fn http_error(provider: &str, status: u16, body: &str) -> ImportError {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .or_else(|| value.get("error").filter(|e| e.is_string()))
                .or_else(|| value.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty())
                .then(|| crate::convert::truncate_chars(trimmed, MAX_ERROR_BODY_CHARS))
        })
        .unwrap_or_else(|| "no response body".to_string());

    ImportError::Http {
        status,
        message: format!("{provider} API error: {detail}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_text_timeout_is_redacted() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let url = format!("{}/v1/models?key=sk-secret-123", server.uri());
        let err = get_text(
            &build_client().unwrap(),
            &url,
            HeaderMap::new(),
            Duration::from_millis(50),
            "sk-secret-123",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ImportError::Timeout(_)));
        let message = err.to_string();
        assert!(message.contains("/v1/models?key=[REDACTED]"), "{message}");
        assert!(!message.contains("sk-secret-123"));
    }

    #[test]
    fn test_http_error_nested_message() {
        let err = http_error(
            "openai",
            401,
            r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#,
        );
        match err {
            ImportError::Http { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "openai API error: Incorrect API key provided");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_http_error_string_and_raw_bodies() {
        let err = http_error("ollama", 404, r#"{"error": "model 'x' not found"}"#);
        assert!(err.to_string().contains("model 'x' not found"));

        let err = http_error("local", 502, "Bad Gateway");
        assert_eq!(err.to_string(), "HTTP 502: local API error: Bad Gateway");

        let err = http_error("local", 500, "");
        assert!(err.to_string().contains("no response body"));
    }

    #[test]
    fn test_resolve_prefers_call_options() {
        let config = ProviderConfig::default()
            .with_endpoint("https://api.example.com/v1/")
            .with_model("base-model");
        let options = CallOptions::new()
            .model("override-model")
            .temperature(0.0)
            .header("X-Trace", "1");

        let resolved = config.resolve(&options);
        assert_eq!(resolved.model, "override-model");
        assert_eq!(resolved.endpoint, "https://api.example.com/v1");
        assert_eq!(resolved.temperature, 0.0);
        assert_eq!(resolved.max_tokens, config.max_tokens);
        assert_eq!(resolved.extra_headers.len(), 1);
    }

    #[test]
    fn test_json_headers_rejects_invalid_name() {
        let err = json_headers(&[], &[("bad header".to_string(), "x".to_string())]).unwrap_err();
        assert!(matches!(err, ImportError::Config(_)));

        let headers = json_headers(
            &[("Authorization", "Bearer k".to_string())],
            &[("X-Title".to_string(), "NoteKit".to_string())],
        )
        .unwrap();
        assert_eq!(headers.get("authorization").unwrap(), "Bearer k");
        assert_eq!(headers.get("x-title").unwrap(), "NoteKit");
        assert_eq!(headers.get("content-type").unwrap(), "application/json");
    }

    #[test]
    fn test_config_debug_hides_key() {
        let config = ProviderConfig::default().with_api_key("sk-hidden");
        assert!(!format!("{config:?}").contains("sk-hidden"));
        assert_eq!(config.redact("key=sk-hidden"), "key=[REDACTED]");
    }

    #[test]
    fn test_create_provider_requires_key() {
        let settings = Settings::default();
        let err = create_provider(&settings, Logger::default()).err().unwrap();
        assert!(err.to_string().contains("API key is required"));
    }

    #[test]
    fn test_create_provider_variants() {
        let local = Settings {
            provider: ProviderKind::Local,
            ..Default::default()
        };
        let provider = create_provider(&local, Logger::default()).unwrap();
        assert_eq!(provider.name(), "local");
        assert!(!provider.requires_api_key());
        assert!(provider.requires_endpoint());

        let gemini = Settings {
            provider: ProviderKind::Gemini,
            api_key: "g-key".to_string(),
            ..Default::default()
        };
        let provider = create_provider(&gemini, Logger::default()).unwrap();
        assert_eq!(provider.name(), "gemini");
        assert_eq!(provider.config().model, "gemini-1.5-flash");

        let ollama = Settings {
            provider: ProviderKind::Ollama,
            model: Some("mistral".to_string()),
            ..Default::default()
        };
        let provider = create_provider(&ollama, Logger::default()).unwrap();
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.config().model, "mistral");
        assert_eq!(provider.config().endpoint, "http://localhost:11434");
    }
}
