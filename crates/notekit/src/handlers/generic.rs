//! Fallback for any web page

use super::article::{parse_article, render_article, validate_article, ARTICLE_SCHEMA};
use super::output::LlmOutput;
use super::{fill_template, ContentTypeHandler, SourceMetadata};
use crate::config::CONTENT_PLACEHOLDER;
use crate::error::ImportError;
use url::Url;

/// Tag of the fallback handler
pub const GENERIC_TYPE: &str = "generic";

const INSTRUCTIONS: &str = "Summarize the following web page as a note. Extract the title, author, publication date, a short summary, the key points, notable quotes and a few topic tags.\nUse \"Not specified\" for any value the page does not provide.\n\nRespond with a single JSON object in a ```json code block using this schema:";

/// Handler for pages no other handler claims
///
/// Never matches by URL; it is the registry's last resort and takes part in
/// content-based classification. The prompt can be replaced with a custom
/// template containing `{{content}}`.
#[derive(Debug, Clone, Default)]
pub struct GenericHandler {
    template: Option<String>,
}

impl GenericHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom prompt template; it must contain `{{content}}`
    pub fn with_template(template: impl Into<String>) -> Result<Self, ImportError> {
        let template = template.into();
        if !template.contains(CONTENT_PLACEHOLDER) {
            return Err(ImportError::Config(format!(
                "prompt template must contain {CONTENT_PLACEHOLDER}"
            )));
        }
        Ok(Self {
            template: Some(template),
        })
    }

    /// The custom template, if one is set
    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    fn default_template() -> String {
        format!("{INSTRUCTIONS}\n{ARTICLE_SCHEMA}\n\nWeb page content:\n{CONTENT_PLACEHOLDER}")
    }
}

impl ContentTypeHandler for GenericHandler {
    fn content_type(&self) -> &'static str {
        GENERIC_TYPE
    }

    fn detect(&self, _url: &Url) -> bool {
        false
    }

    fn requires_content_detection(&self) -> bool {
        true
    }

    fn folder_name(&self) -> &'static str {
        "Articles"
    }

    fn prompt(&self, content: &str) -> Result<String, ImportError> {
        match &self.template {
            Some(template) => fill_template(template, content),
            None => fill_template(&Self::default_template(), content),
        }
    }

    fn parse_llm_response(&self, raw: &str) -> Result<LlmOutput, ImportError> {
        parse_article(raw)
    }

    fn validate_llm_output(&self, output: &mut LlmOutput) -> Result<(), ImportError> {
        validate_article(output)
    }

    fn render_note(
        &self,
        output: &LlmOutput,
        source: &SourceMetadata,
    ) -> Result<String, ImportError> {
        render_article(output, source, "Source")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_detects() {
        let handler = GenericHandler::new();
        assert!(!handler.detect(&Url::parse("https://example.com/article").unwrap()));
        assert!(handler.requires_content_detection());
        assert_eq!(handler.folder_name(), "Articles");
    }

    #[test]
    fn test_default_prompt() {
        let prompt = GenericHandler::new().prompt("Some page text").unwrap();
        assert!(prompt.contains("\"keyPoints\""));
        assert!(prompt.ends_with("Web page content:\nSome page text"));
    }

    #[test]
    fn test_custom_template() {
        let handler = GenericHandler::with_template("TL;DR as JSON: {{content}}").unwrap();
        assert_eq!(handler.prompt("abc").unwrap(), "TL;DR as JSON: abc");
        assert_eq!(handler.template(), Some("TL;DR as JSON: {{content}}"));

        let err = GenericHandler::with_template("no placeholder").unwrap_err();
        assert!(matches!(err, ImportError::Config(_)));
    }

    #[test]
    fn test_note_content() {
        let raw = r#"{"title": "Release notes", "summary": "Version 2 is out.", "keyPoints": ["Faster"], "tags": []}"#;
        let note = GenericHandler::new()
            .note_content(raw, &SourceMetadata::new("https://example.com/releases"))
            .unwrap();
        assert!(note.starts_with("# Release notes\n\n[Source](https://example.com/releases)\n"));
        assert!(note.contains("## Summary\n\nVersion 2 is out.\n"));
        assert!(note.contains("- Faster"));
    }
}
