//! Content-type registry
//!
//! Two-phase detection: URL patterns first, LLM classification of the page
//! text only when no pattern matches. Results and fetched pages are cached
//! per URL for the life of the registry.

use crate::convert::truncate_chars;
use crate::error::ImportError;
use crate::fetch::{FetchedPage, PageFetcher};
use crate::handlers::{default_handlers, ContentTypeHandler, GENERIC_TYPE};
use crate::logger::Logger;
use crate::providers::{CallOptions, LlmProvider};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use url::Url;

/// Page text sent to the classifier
pub const CLASSIFICATION_EXCERPT_CHARS: usize = 2000;

/// Conversational prefixes models put before the answer
const FILLER_PREFIXES: &[&str] = &[
    "i think it is",
    "i think it's",
    "i think",
    "i believe",
    "this is a",
    "this is an",
    "this is",
    "it is a",
    "it is an",
    "it is",
    "it's a",
    "it's",
    "the answer is",
    "the content type is",
    "content type:",
    "category:",
    "answer:",
    "type:",
    "a",
    "an",
    "the",
];

/// Handler lookup and dispatch for URLs
pub struct ContentTypeRegistry {
    handlers: Vec<Arc<dyn ContentTypeHandler>>,
    fetcher: Arc<dyn PageFetcher>,
    provider: Option<Arc<dyn LlmProvider>>,
    logger: Logger,
    detection_cache: RwLock<HashMap<String, String>>,
    page_cache: RwLock<HashMap<String, FetchedPage>>,
}

impl ContentTypeRegistry {
    /// Empty registry with no provider
    pub fn new(fetcher: Arc<dyn PageFetcher>, logger: Logger) -> Self {
        Self {
            handlers: Vec::new(),
            fetcher,
            provider: None,
            logger,
            detection_cache: RwLock::new(HashMap::new()),
            page_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Registry with the built-in handlers
    pub fn with_defaults(
        fetcher: Arc<dyn PageFetcher>,
        provider: Option<Arc<dyn LlmProvider>>,
        logger: Logger,
    ) -> Self {
        let mut registry = Self::new(fetcher, logger).with_provider(provider);
        for handler in default_handlers() {
            registry.register(handler);
        }
        registry
    }

    /// Set the provider used for content classification
    pub fn with_provider(mut self, provider: Option<Arc<dyn LlmProvider>>) -> Self {
        self.provider = provider;
        self
    }

    /// Append a handler; earlier registrations win on overlapping patterns
    pub fn register(&mut self, handler: Arc<dyn ContentTypeHandler>) {
        self.logger.debug(format!(
            "Registered content type handler: {}",
            handler.content_type()
        ));
        self.handlers.push(handler);
    }

    /// Remove every handler with the given tag; returns whether any was removed
    pub fn unregister(&mut self, content_type: &str) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|h| h.content_type() != content_type);
        self.handlers.len() != before
    }

    pub fn handlers(&self) -> &[Arc<dyn ContentTypeHandler>] {
        &self.handlers
    }

    /// First handler registered under `content_type`
    pub fn handler(&self, content_type: &str) -> Option<Arc<dyn ContentTypeHandler>> {
        self.handlers
            .iter()
            .find(|h| h.content_type() == content_type)
            .cloned()
    }

    /// Registered tags, in registration order
    pub fn handler_types(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.content_type()).collect()
    }

    pub fn provider(&self) -> Option<&Arc<dyn LlmProvider>> {
        self.provider.as_ref()
    }

    /// Empty both caches
    pub fn clear_cache(&self) {
        write(&self.detection_cache).clear();
        write(&self.page_cache).clear();
        self.logger.debug("Content type caches cleared");
    }

    /// Cached type for `url`, if any
    pub fn cached_type(&self, url: &str) -> Option<String> {
        read(&self.detection_cache).get(url).cloned()
    }

    /// Find the handler for `url`
    pub async fn detect_content_type(
        &self,
        url: &str,
    ) -> Result<Arc<dyn ContentTypeHandler>, ImportError> {
        let parsed = parse_url(url)?;

        if let Some(handler) = self.cached_handler(url) {
            return Ok(handler);
        }

        if let Some(handler) = self.handlers.iter().find(|h| h.detect(&parsed)) {
            self.logger.debug(format!(
                "Detected {} from URL pattern: {}",
                handler.content_type(),
                url
            ));
            self.remember(url, handler.content_type());
            return Ok(handler.clone());
        }

        let candidates: Vec<&'static str> = self
            .handlers
            .iter()
            .filter(|h| h.requires_content_detection())
            .map(|h| h.content_type())
            .collect();
        let Some(provider) = self.provider.as_ref().filter(|_| !candidates.is_empty()) else {
            return self.generic_fallback(url);
        };

        match self.classify(url, &parsed, &**provider, &candidates).await {
            Ok(Some(handler)) => {
                self.remember(url, handler.content_type());
                Ok(handler)
            }
            Ok(None) => self.generic_fallback(url),
            Err(e) => match self.handler(GENERIC_TYPE) {
                Some(generic) => {
                    self.logger.warn(format!(
                        "Content detection failed for {}, using {}: {}",
                        url, GENERIC_TYPE, e
                    ));
                    Ok(generic)
                }
                None => Err(e),
            },
        }
    }

    /// Fetch `url`, or return the copy cached during detection
    pub async fn page_content(&self, url: &str) -> Result<FetchedPage, ImportError> {
        let parsed = parse_url(url)?;
        self.load_page(url, &parsed).await
    }

    async fn load_page(&self, url: &str, parsed: &Url) -> Result<FetchedPage, ImportError> {
        let cached = read(&self.page_cache).get(url).cloned();
        if let Some(page) = cached {
            self.logger.debug(format!("Page cache hit: {}", url));
            return Ok(page);
        }

        let mut page = self
            .fetcher
            .fetch_page(parsed)
            .await
            .map_err(|e| ImportError::ContentFetch {
                url: url.to_string(),
                source: Box::new(e),
            })?;
        page.url = url.to_string();

        write(&self.page_cache).insert(url.to_string(), page.clone());
        Ok(page)
    }

    /// Ask the provider which candidate type the page is
    async fn classify(
        &self,
        url: &str,
        parsed: &Url,
        provider: &dyn LlmProvider,
        candidates: &[&'static str],
    ) -> Result<Option<Arc<dyn ContentTypeHandler>>, ImportError> {
        let page = self.load_page(url, parsed).await?;
        let excerpt = truncate_chars(page.text.trim(), CLASSIFICATION_EXCERPT_CHARS);
        if excerpt.is_empty() {
            self.logger
                .debug(format!("No page text to classify for {}", url));
            return Ok(None);
        }

        let prompt = classification_prompt(candidates, &page, &excerpt);
        let options = CallOptions::new().temperature(0.0).max_tokens(10);
        let answer = provider.call_llm(&prompt, &options).await?;
        let normalized = normalize_classification(&answer);

        self.logger.debug(format!(
            "Classified {} as {:?} (raw answer {:?})",
            url, normalized, answer
        ));

        Ok(candidates
            .iter()
            .chain(std::iter::once(&GENERIC_TYPE))
            .find(|tag| **tag == normalized)
            .and_then(|tag| self.handler(tag)))
    }

    fn cached_handler(&self, url: &str) -> Option<Arc<dyn ContentTypeHandler>> {
        let tag = self.cached_type(url)?;
        match self.handler(&tag) {
            Some(handler) => {
                self.logger
                    .debug(format!("Detection cache hit: {} -> {}", url, tag));
                Some(handler)
            }
            None => {
                write(&self.detection_cache).remove(url);
                None
            }
        }
    }

    fn remember(&self, url: &str, content_type: &str) {
        write(&self.detection_cache).insert(url.to_string(), content_type.to_string());
    }

    fn generic_fallback(&self, url: &str) -> Result<Arc<dyn ContentTypeHandler>, ImportError> {
        let handler = self
            .handler(GENERIC_TYPE)
            .ok_or_else(|| ImportError::NoHandlerFound(url.to_string()))?;
        self.remember(url, GENERIC_TYPE);
        Ok(handler)
    }
}

/// Absolute http(s) URL or `InvalidUrl`
fn parse_url(url: &str) -> Result<Url, ImportError> {
    let parsed = Url::parse(url.trim()).map_err(|e| ImportError::InvalidUrl(format!("{url}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ImportError::InvalidUrl(format!(
            "{url}: only http and https URLs are supported"
        )));
    }
    Ok(parsed)
}

fn classification_prompt(candidates: &[&str], page: &FetchedPage, excerpt: &str) -> String {
    let mut options: Vec<&str> = candidates.to_vec();
    if !options.contains(&GENERIC_TYPE) {
        options.push(GENERIC_TYPE);
    }
    let title = page.title.as_deref().unwrap_or("Unknown");
    format!(
        "Classify the following web page into exactly one of these content types: {}.\n\
         Respond with only the content type as a single lowercase word. \
         If none of them fit, respond with \"{}\".\n\n\
         Title: {}\n\nContent:\n{}",
        options.join(", "),
        GENERIC_TYPE,
        title,
        excerpt
    )
}

/// Reduce a free-form classifier answer to a single lowercase word
pub fn normalize_classification(answer: &str) -> String {
    let line = answer.trim().lines().next().unwrap_or_default();
    let mut text = line
        .trim()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();

    // Strip filler repeatedly, e.g. "Answer: I think it is a recipe"
    loop {
        let stripped = FILLER_PREFIXES.iter().find_map(|prefix| {
            let rest = text.strip_prefix(prefix)?;
            let at_boundary = prefix.ends_with(':')
                || rest.is_empty()
                || rest.starts_with(|c: char| !c.is_alphanumeric());
            at_boundary.then(|| rest.trim_start_matches(|c: char| !c.is_alphanumeric()).to_string())
        });
        match stripped {
            Some(rest) => text = rest,
            None => break,
        }
    }

    text.split(|c: char| !c.is_alphanumeric() && c != '_' && c != '-')
        .find(|word| !word.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
