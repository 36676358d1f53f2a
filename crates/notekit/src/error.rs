//! Error types for NoteKit

use crate::redact::redact_api_key;
use thiserror::Error;

/// Errors that can occur while detecting, extracting or rendering a note
#[derive(Debug, Error)]
pub enum ImportError {
    /// URL could not be parsed or is not http(s)
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// No registered handler claimed the URL and no generic fallback exists
    #[error("No content type handler found for URL: {0}")]
    NoHandlerFound(String),

    /// Nothing to build a prompt from
    #[error("No content available to process")]
    MissingContent,

    /// No JSON object could be located in the LLM response, or it was malformed
    #[error("Failed to parse LLM response: {0}")]
    Parse(String),

    /// The LLM answered with the category sentinel (e.g. "Not a movie")
    #[error("Content is not a {0}")]
    NotInCategory(String),

    /// Structured output is missing required data
    #[error("Incomplete extraction: {0}")]
    IncompleteExtraction(String),

    /// Provider answered with a body shape we do not understand
    #[error("Invalid response format from {0}")]
    InvalidResponseFormat(String),

    /// Request did not complete in time
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Non-2xx HTTP status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Connection or transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// Provider call failed, possibly after retries
    #[error("LLM call failed after {attempts} attempt(s): {source}")]
    LlmCallFailed {
        attempts: u32,
        #[source]
        source: Box<ImportError>,
    },

    /// Page fetch failed
    #[error("Failed to fetch {url}: {source}")]
    ContentFetch {
        url: String,
        #[source]
        source: Box<ImportError>,
    },

    /// Invalid settings or provider construction failure
    #[error("Configuration error: {0}")]
    Config(String),

    /// An operation needed an LLM provider but none is configured
    #[error("No LLM provider configured")]
    ProviderNotConfigured,
}

impl ImportError {
    /// Create an error from a reqwest error
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ImportError::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            ImportError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            ImportError::Network(err.to_string())
        }
    }

    /// Replace every occurrence of `secret` in this error, including wrapped sources
    pub fn redact(self, secret: &str) -> Self {
        if secret.is_empty() {
            return self;
        }
        let r = |message: String| redact_api_key(&message, secret);
        match self {
            ImportError::InvalidUrl(m) => ImportError::InvalidUrl(r(m)),
            ImportError::NoHandlerFound(m) => ImportError::NoHandlerFound(r(m)),
            ImportError::MissingContent => ImportError::MissingContent,
            ImportError::Parse(m) => ImportError::Parse(r(m)),
            ImportError::NotInCategory(m) => ImportError::NotInCategory(r(m)),
            ImportError::IncompleteExtraction(m) => ImportError::IncompleteExtraction(r(m)),
            ImportError::InvalidResponseFormat(m) => ImportError::InvalidResponseFormat(r(m)),
            ImportError::Timeout(m) => ImportError::Timeout(r(m)),
            ImportError::Http { status, message } => ImportError::Http {
                status,
                message: r(message),
            },
            ImportError::Network(m) => ImportError::Network(r(m)),
            ImportError::LlmCallFailed { attempts, source } => ImportError::LlmCallFailed {
                attempts,
                source: Box::new(source.redact(secret)),
            },
            ImportError::ContentFetch { url, source } => ImportError::ContentFetch {
                url: r(url),
                source: Box::new(source.redact(secret)),
            },
            ImportError::Config(m) => ImportError::Config(r(m)),
            ImportError::ProviderNotConfigured => ImportError::ProviderNotConfigured,
        }
    }

    /// Innermost error, skipping retry and fetch wrappers
    pub fn root_cause(&self) -> &ImportError {
        match self {
            ImportError::LlmCallFailed { source, .. } | ImportError::ContentFetch { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }
}
