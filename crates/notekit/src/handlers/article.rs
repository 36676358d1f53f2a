//! Article extraction shared by the generic and Medium handlers

use super::json::parse_json_object;
use super::output::{fill_blank, is_blank, ArticleDetails, LlmOutput};
use super::render::NoteBuilder;
use super::{is_sentinel, wrong_variant, SourceMetadata};
use crate::error::ImportError;

/// Key the JSON scan anchors on
pub(super) const ARTICLE_ANCHOR: &str = "title";

/// Title the model returns when the page is not an article
pub(super) const ARTICLE_SENTINEL: &str = "Not an article";

/// Title used when the model returns none
pub(super) const UNTITLED_ARTICLE: &str = "Untitled Article";

/// Schema block embedded in article prompts
pub(super) const ARTICLE_SCHEMA: &str = r#"```json
{
  "title": "Article title",
  "author": "Author name or \"Not specified\"",
  "publishedDate": "Publication date or \"Not specified\"",
  "summary": "Two to four sentence summary",
  "keyPoints": ["Main point", "..."],
  "quotes": ["Notable quote", "..."],
  "tags": ["topic", "..."]
}
```"#;

pub(super) fn parse_article(raw: &str) -> Result<LlmOutput, ImportError> {
    let mut details: ArticleDetails = parse_json_object(raw, ARTICLE_ANCHOR)?;
    fill_blank(&mut details.title, UNTITLED_ARTICLE);
    Ok(LlmOutput::Article(details))
}

pub(super) fn validate_article(output: &mut LlmOutput) -> Result<(), ImportError> {
    let LlmOutput::Article(details) = output else {
        return Err(wrong_variant("article", output));
    };
    if is_sentinel(&details.title, ARTICLE_SENTINEL) {
        return Err(ImportError::NotInCategory("article".to_string()));
    }
    if is_blank(&details.summary) && details.key_points.iter().all(|p| is_blank(p)) {
        return Err(ImportError::IncompleteExtraction(
            "article has no summary or key points".to_string(),
        ));
    }
    fill_blank(&mut details.title, UNTITLED_ARTICLE);
    Ok(())
}

pub(super) fn render_article(
    output: &LlmOutput,
    source: &SourceMetadata,
    link_label: &str,
) -> Result<String, ImportError> {
    let LlmOutput::Article(article) = output else {
        return Err(wrong_variant("article", output));
    };

    let tags: Vec<String> = article
        .tags
        .iter()
        .filter(|tag| !is_blank(tag))
        .map(|tag| hashtag(tag))
        .collect();

    Ok(NoteBuilder::new(&article.title)
        .link(link_label, &source.url)
        .image(&article.title, source.image.as_deref())
        .field("Author", &article.author)
        .field("Published", &article.published_date)
        .field("Site", source.site_name.as_deref().unwrap_or_default())
        .end_fields()
        .paragraph("Summary", &article.summary)
        .bullets("Key Points", &article.key_points)
        .quotes("Quotes", &article.quotes)
        .field("Tags", &tags.join(" "))
        .finish())
}

/// `Machine Learning` -> `#machine-learning`
fn hashtag(tag: &str) -> String {
    let slug: String = tag
        .trim()
        .trim_start_matches('#')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase();
    format!("#{slug}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fills_title() {
        let output = parse_article(r#"{"title": "", "summary": "S"}"#).unwrap();
        assert_eq!(output.title(), UNTITLED_ARTICLE);
    }

    #[test]
    fn test_validate_rejects_sentinel() {
        let mut output = LlmOutput::Article(ArticleDetails {
            title: ARTICLE_SENTINEL.to_string(),
            summary: "Login page.".to_string(),
            ..Default::default()
        });
        assert!(matches!(
            validate_article(&mut output),
            Err(ImportError::NotInCategory(ref c)) if c == "article"
        ));
    }

    #[test]
    fn test_validate_requires_summary_or_points() {
        let mut empty = LlmOutput::Article(ArticleDetails {
            title: "T".to_string(),
            summary: "Not specified".to_string(),
            ..Default::default()
        });
        assert!(matches!(
            validate_article(&mut empty),
            Err(ImportError::IncompleteExtraction(_))
        ));

        let mut points_only = LlmOutput::Article(ArticleDetails {
            key_points: vec!["One".to_string()],
            ..Default::default()
        });
        validate_article(&mut points_only).unwrap();
        assert_eq!(points_only.title(), UNTITLED_ARTICLE);
    }

    #[test]
    fn test_hashtag() {
        assert_eq!(hashtag("Machine Learning"), "#machine-learning");
        assert_eq!(hashtag("#rust"), "#rust");
    }

    #[test]
    fn test_render() {
        let output = LlmOutput::Article(ArticleDetails {
            title: "Async Rust".to_string(),
            author: "Jane Doe".to_string(),
            published_date: "Not specified".to_string(),
            summary: "An overview.".to_string(),
            key_points: vec!["Futures are lazy".to_string()],
            quotes: vec![],
            tags: vec!["Rust".to_string(), "async io".to_string()],
        });
        let source = SourceMetadata {
            url: "https://blog.example.com/async".to_string(),
            site_name: Some("Example Blog".to_string()),
            ..Default::default()
        };

        let note = render_article(&output, &source, "Source").unwrap();
        assert_eq!(
            note,
            "# Async Rust\n\n\
             [Source](https://blog.example.com/async)\n\n\
             **Author:** Jane Doe\n\
             **Site:** Example Blog\n\n\
             ## Summary\n\nAn overview.\n\n\
             ## Key Points\n\n- Futures are lazy\n\n\
             **Tags:** #rust #async-io\n"
        );
    }
}
