//! Page fetching
//!
//! [`PageFetcher`] is the HTTP primitive the registry and importer depend on.
//! [`HttpPageFetcher`] is the reqwest-backed default: it downloads the page,
//! converts HTML to text and reads title/description/image metadata.

use crate::convert::{extract_page_metadata, html_to_text, is_html};
use crate::error::ImportError;
use crate::handlers::SourceMetadata;
use crate::DEFAULT_USER_AGENT;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use std::time::Duration;
use tracing::{error, warn};
use url::Url;

/// Binary content type prefixes
const BINARY_PREFIXES: &[&str] = &[
    "image/",
    "audio/",
    "video/",
    "application/octet-stream",
    "application/pdf",
    "application/zip",
    "application/gzip",
    "font/",
];

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Time allowed for response headers
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(15);

/// Body timeout (total)
const BODY_TIMEOUT: Duration = Duration::from_secs(30);

/// A downloaded page reduced to text plus metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedPage {
    /// The fetched URL
    pub url: String,
    /// HTTP status code
    pub status_code: u16,
    /// Content-Type header value
    pub content_type: Option<String>,
    /// Page title (`og:title`, then `<title>`)
    pub title: Option<String>,
    /// Page description
    pub description: Option<String>,
    /// Lead image URL
    pub image: Option<String>,
    /// Site name
    pub site_name: Option<String>,
    /// Visible text; empty for binary content
    pub text: String,
    /// True if the body read timed out and `text` is partial
    pub truncated: bool,
}

impl FetchedPage {
    /// Metadata handed to note rendering
    pub fn metadata(&self) -> SourceMetadata {
        SourceMetadata {
            url: self.url.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            image: self.image.clone(),
            site_name: self.site_name.clone(),
        }
    }
}

/// Fetches page content for detection and extraction
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &Url) -> Result<FetchedPage, ImportError>;
}

/// reqwest-backed [`PageFetcher`]
#[derive(Debug, Clone, Default)]
pub struct HttpPageFetcher {
    user_agent: Option<String>,
}

impl HttpPageFetcher {
    /// Create a new fetcher with the default User-Agent
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom User-Agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, url: &Url) -> Result<FetchedPage, ImportError> {
        let mut headers = HeaderMap::new();
        let user_agent = self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT)),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html, application/xhtml+xml, text/plain, */*;q=0.8"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ImportError::Config(format!("Failed to create HTTP client: {e}")))?;

        let response = tokio::time::timeout(RESPONSE_TIMEOUT, client.get(url.as_str()).send())
            .await
            .map_err(|_| {
                ImportError::Timeout(format!(
                    "{} did not respond within {}s",
                    url,
                    RESPONSE_TIMEOUT.as_secs()
                ))
            })?
            .map_err(ImportError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImportError::Http {
                status: status.as_u16(),
                message: format!(
                    "Page request failed: {}",
                    status.canonical_reason().unwrap_or("unknown status")
                ),
            });
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let mut page = FetchedPage {
            url: url.to_string(),
            status_code: status.as_u16(),
            content_type: content_type.clone(),
            ..Default::default()
        };

        if let Some(ref ct) = content_type {
            if is_binary_content_type(ct) {
                warn!(url = %url, content_type = %ct, "Binary content, no text extracted");
                return Ok(page);
            }
        }

        let (body, truncated) = read_body_with_timeout(response, BODY_TIMEOUT).await;
        let raw = String::from_utf8_lossy(&body).to_string();

        if is_html(&content_type, &raw) {
            let metadata = extract_page_metadata(&raw);
            page.title = metadata.title;
            page.description = metadata.description;
            page.image = metadata.image.map(|image| absolutize(url, &image));
            page.site_name = metadata.site_name;
            page.text = html_to_text(&raw);
        } else {
            page.text = raw.trim().to_string();
        }
        page.truncated = truncated;

        Ok(page)
    }
}

/// Check if content type indicates binary content
fn is_binary_content_type(content_type: &str) -> bool {
    let ct_lower = content_type.to_lowercase();
    BINARY_PREFIXES
        .iter()
        .any(|prefix| ct_lower.starts_with(prefix))
}

/// Resolve a possibly relative image reference against the page URL
fn absolutize(base: &Url, reference: &str) -> String {
    base.join(reference)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| reference.to_string())
}

/// Read response body with timeout, returning partial content if timeout occurs
async fn read_body_with_timeout(response: reqwest::Response, timeout: Duration) -> (Bytes, bool) {
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        let chunk_future = stream.next();
        let timeout_future = tokio::time::sleep_until(deadline);

        tokio::select! {
            chunk = chunk_future => {
                match chunk {
                    Some(Ok(bytes)) => {
                        body.extend_from_slice(&bytes);
                    }
                    Some(Err(e)) => {
                        error!("Error reading body chunk: {}", e);
                        let has_content = !body.is_empty();
                        return (Bytes::from(body), has_content);
                    }
                    None => {
                        return (Bytes::from(body), false);
                    }
                }
            }
            _ = timeout_future => {
                warn!("Body timeout reached, returning partial content");
                return (Bytes::from(body), true);
            }
        }
    }
}
