//! Medium articles

use super::article::{
    parse_article, render_article, validate_article, ARTICLE_SCHEMA, ARTICLE_SENTINEL,
};
use super::output::LlmOutput;
use super::{fill_template, host_matches, ContentTypeHandler, SourceMetadata};
use crate::config::CONTENT_PLACEHOLDER;
use crate::error::ImportError;
use std::sync::OnceLock;
use url::Url;

/// Publications hosted on Medium under their own domains
const MEDIUM_DOMAINS: &[&str] = &[
    "medium.com",
    "towardsdatascience.com",
    "betterprogramming.pub",
    "levelup.gitconnected.com",
    "uxdesign.cc",
    "javascript.plainenglish.io",
    "hackernoon.com",
];

const INSTRUCTIONS: &str = "Summarize the following Medium article as a note. Extract the article title, the author, the publication date, a short summary, the key points, memorable quotes and the article's topic tags.\nUse \"Not specified\" for any value the page does not provide.";

fn prompt_template() -> &'static str {
    static TEMPLATE: OnceLock<String> = OnceLock::new();
    TEMPLATE.get_or_init(|| {
        format!(
            "{INSTRUCTIONS}\nIf the page is not an article, respond with \"title\" set to exactly \"{ARTICLE_SENTINEL}\".\n\n\
             Respond with a single JSON object in a ```json code block using this schema:\n{ARTICLE_SCHEMA}\n\n\
             Article content:\n{CONTENT_PLACEHOLDER}"
        )
    })
}

/// Handler for Medium and Medium-hosted publications
#[derive(Debug, Default, Clone)]
pub struct MediumHandler;

impl MediumHandler {
    pub fn new() -> Self {
        Self
    }
}

impl ContentTypeHandler for MediumHandler {
    fn content_type(&self) -> &'static str {
        "medium"
    }

    fn detect(&self, url: &Url) -> bool {
        MEDIUM_DOMAINS.iter().any(|domain| host_matches(url, domain))
    }

    fn folder_name(&self) -> &'static str {
        "Medium"
    }

    fn prompt(&self, content: &str) -> Result<String, ImportError> {
        fill_template(prompt_template(), content)
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
        render_article(output, source, "Read on Medium")
    }
}
