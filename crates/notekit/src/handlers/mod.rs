//! Content-type handlers
//!
//! Each handler owns one note category: URL detection, the extraction
//! prompt, parsing and validation of the model's JSON, and Markdown
//! rendering. Handlers are stateless and registered by instance, in priority
//! order, with the [`ContentTypeRegistry`](crate::ContentTypeRegistry).

mod article;
mod generic;
mod json;
mod medium;
mod movie;
mod output;
mod recipe;
mod render;
mod youtube;

pub use generic::{GenericHandler, GENERIC_TYPE};
pub use json::{locate_json, parse_json_object};
pub use medium::MediumHandler;
pub use movie::MovieHandler;
pub use output::{
    is_blank, ArticleDetails, LlmOutput, MovieDetails, RecipeDetails, VideoDetails, NOT_SPECIFIED,
};
pub use recipe::RecipeHandler;
pub use render::NoteBuilder;
pub use youtube::{video_id, YouTubeHandler};

use crate::config::CONTENT_PLACEHOLDER;
use crate::convert::truncate_chars;
use crate::error::ImportError;
use serde::Serialize;
use std::sync::Arc;
use url::Url;

/// Page text beyond this many characters is cut before prompting
pub const MAX_PROMPT_CONTENT_CHARS: usize = 15_000;

/// Where the note came from
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceMetadata {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub site_name: Option<String>,
}

impl SourceMetadata {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// One note category
pub trait ContentTypeHandler: Send + Sync {
    /// Unique type tag, e.g. `"movie"`
    fn content_type(&self) -> &'static str;

    /// Pure URL-pattern check; never performs I/O
    fn detect(&self, url: &Url) -> bool;

    /// Whether this category can only be recognized from page content
    fn requires_content_detection(&self) -> bool {
        false
    }

    /// Subfolder for notes of this category
    fn folder_name(&self) -> &'static str;

    /// Extraction prompt for `content`
    fn prompt(&self, content: &str) -> Result<String, ImportError>;

    fn parse_llm_response(&self, raw: &str) -> Result<LlmOutput, ImportError>;

    /// Category checks; backfills defaults in place
    fn validate_llm_output(&self, output: &mut LlmOutput) -> Result<(), ImportError>;

    fn render_note(&self, output: &LlmOutput, source: &SourceMetadata)
        -> Result<String, ImportError>;

    /// Parse and validate a raw model response
    fn extract(&self, raw: &str) -> Result<LlmOutput, ImportError> {
        let mut output = self.parse_llm_response(raw)?;
        self.validate_llm_output(&mut output)?;
        Ok(output)
    }

    /// Parse, validate and render a raw model response
    fn note_content(&self, raw: &str, source: &SourceMetadata) -> Result<String, ImportError> {
        let output = self.extract(raw)?;
        self.render_note(&output, source)
    }
}

/// Built-in handlers in detection priority order
pub fn default_handlers() -> Vec<Arc<dyn ContentTypeHandler>> {
    vec![
        Arc::new(YouTubeHandler::new()),
        Arc::new(MediumHandler::new()),
        Arc::new(MovieHandler::new()),
        Arc::new(RecipeHandler::new()),
        Arc::new(GenericHandler::new()),
    ]
}

/// True if the URL's host is `domain` or a subdomain of it
pub fn host_matches(url: &Url, domain: &str) -> bool {
    url.host_str().is_some_and(|host| {
        let host = host.to_ascii_lowercase();
        host == domain
            || host
                .strip_suffix(domain)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

/// Interpolate capped page content into a prompt template
pub(crate) fn fill_template(template: &str, content: &str) -> Result<String, ImportError> {
    if content.trim().is_empty() {
        return Err(ImportError::MissingContent);
    }
    let content = truncate_chars(content.trim(), MAX_PROMPT_CONTENT_CHARS);
    Ok(template.replace(CONTENT_PLACEHOLDER, &content))
}

/// Error for an output of the wrong category
pub(crate) fn wrong_variant(expected: &str, output: &LlmOutput) -> ImportError {
    ImportError::IncompleteExtraction(format!(
        "expected {} output, got {}",
        expected,
        output.kind()
    ))
}

/// True if `value` is exactly the category sentinel
pub(crate) fn is_sentinel(value: &str, sentinel: &str) -> bool {
    value == sentinel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_matches() {
        let url = Url::parse("https://www.imdb.com/title/tt0133093/").unwrap();
        assert!(host_matches(&url, "imdb.com"));
        assert!(!host_matches(&url, "db.com"));

        let url = Url::parse("https://IMDB.com/").unwrap();
        assert!(host_matches(&url, "imdb.com"));

        let url = Url::parse("https://notimdb.com/").unwrap();
        assert!(!host_matches(&url, "imdb.com"));
    }

    #[test]
    fn test_fill_template() {
        assert!(matches!(
            fill_template("Content: {{content}}", " \n\t"),
            Err(ImportError::MissingContent)
        ));
        assert_eq!(
            fill_template("Content: {{content}}", "  hello ").unwrap(),
            "Content: hello"
        );

        let long = "x".repeat(MAX_PROMPT_CONTENT_CHARS + 10);
        let prompt = fill_template("{{content}}", &long).unwrap();
        assert_eq!(prompt.chars().count(), MAX_PROMPT_CONTENT_CHARS + 3);
        assert!(prompt.ends_with("..."));
    }

    #[test]
    fn test_is_sentinel_exact() {
        assert!(is_sentinel("Not a movie", "Not a movie"));
        assert!(!is_sentinel("not a movie", "Not a movie"));
        assert!(!is_sentinel("Not a movie, but a series", "Not a movie"));
    }

    #[test]
    fn test_default_handler_order() {
        let types: Vec<_> = default_handlers()
            .iter()
            .map(|h| h.content_type())
            .collect();
        assert_eq!(types, vec!["youtube", "medium", "movie", "recipe", "generic"]);
    }

    #[test]
    fn test_default_handlers_are_pure() {
        let url = Url::parse("https://example.com/blog/post").unwrap();
        for handler in default_handlers() {
            assert!(!handler.detect(&url), "{} matched", handler.content_type());
        }
    }
}
