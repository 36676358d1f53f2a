//! YouTube videos

use super::json::parse_json_object;
use super::output::{fill_blank, is_blank, LlmOutput, VideoDetails};
use super::render::NoteBuilder;
use super::{
    fill_template, host_matches, is_sentinel, wrong_variant, ContentTypeHandler, SourceMetadata,
};
use crate::error::ImportError;
use url::Url;

const UNTITLED: &str = "Untitled Video";

const SENTINEL: &str = "Not a video";

const PROMPT_TEMPLATE: &str = r#"Summarize the YouTube video described by the following page content (title, description and any transcript text).
Use "Not specified" for any value the page does not provide.
If the page does not describe a video, respond with "videoTitle" set to exactly "Not a video".

Respond with a single JSON object in a ```json code block using this schema:
```json
{
  "videoTitle": "Title of the video",
  "channel": "Channel name",
  "summary": "Two to four sentence summary",
  "keyPoints": ["Main point", "..."],
  "topics": ["Topic", "..."]
}
```

Page content:
{{content}}"#;

/// Extract the video id from a YouTube URL
///
/// Understands `youtube.com/watch?v=<id>`, `youtu.be/<id>`,
/// `youtube.com/shorts/<id>` and `youtube.com/embed/<id>`.
pub fn video_id(url: &Url) -> Option<String> {
    let id = if host_matches(url, "youtu.be") {
        url.path_segments()?.next()?.to_string()
    } else if host_matches(url, "youtube.com") || host_matches(url, "youtube-nocookie.com") {
        let mut segments = url.path_segments()?;
        match segments.next()? {
            "watch" => url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned())?,
            "shorts" | "embed" => segments.next()?.to_string(),
            _ => return None,
        }
    } else {
        return None;
    };

    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then_some(id)
}

/// Handler for YouTube videos
#[derive(Debug, Default, Clone)]
pub struct YouTubeHandler;

impl YouTubeHandler {
    pub fn new() -> Self {
        Self
    }
}

impl ContentTypeHandler for YouTubeHandler {
    fn content_type(&self) -> &'static str {
        "youtube"
    }

    fn detect(&self, url: &Url) -> bool {
        video_id(url).is_some()
    }

    fn folder_name(&self) -> &'static str {
        "YouTube"
    }

    fn prompt(&self, content: &str) -> Result<String, ImportError> {
        fill_template(PROMPT_TEMPLATE, content)
    }

    fn parse_llm_response(&self, raw: &str) -> Result<LlmOutput, ImportError> {
        let mut details: VideoDetails = parse_json_object(raw, "videoTitle")?;
        fill_blank(&mut details.video_title, UNTITLED);
        Ok(LlmOutput::Video(details))
    }

    fn validate_llm_output(&self, output: &mut LlmOutput) -> Result<(), ImportError> {
        let LlmOutput::Video(video) = output else {
            return Err(wrong_variant("video", output));
        };
        if is_sentinel(&video.video_title, SENTINEL) {
            return Err(ImportError::NotInCategory("video".to_string()));
        }
        if is_blank(&video.summary) && video.key_points.iter().all(|p| is_blank(p)) {
            return Err(ImportError::IncompleteExtraction(
                "video has no summary or key points".to_string(),
            ));
        }
        fill_blank(&mut video.video_title, UNTITLED);
        Ok(())
    }

    fn render_note(
        &self,
        output: &LlmOutput,
        source: &SourceMetadata,
    ) -> Result<String, ImportError> {
        let LlmOutput::Video(video) = output else {
            return Err(wrong_variant("video", output));
        };

        let embed = Url::parse(&source.url)
            .ok()
            .and_then(|url| video_id(&url))
            .map(|id| {
                format!(
                    "<iframe width=\"560\" height=\"315\" src=\"https://www.youtube.com/embed/{id}\" frameborder=\"0\" allowfullscreen></iframe>"
                )
            })
            .unwrap_or_default();

        let builder = NoteBuilder::new(&video.video_title).link("Watch on YouTube", &source.url);
        // Thumbnail only when there is nothing to embed
        let builder = if embed.is_empty() {
            builder.image(&video.video_title, source.image.as_deref())
        } else {
            builder.block(&embed)
        };

        Ok(builder
            .field("Channel", &video.channel)
            .end_fields()
            .paragraph("Summary", &video.summary)
            .bullets("Key Points", &video.key_points)
            .bullets("Topics", &video.topics)
            .finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Option<String> {
        video_id(&Url::parse(s).unwrap())
    }

    #[test]
    fn test_video_id() {
        assert_eq!(id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(
            id("https://m.youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=42").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(id("https://youtu.be/dQw4w9WgXcQ?t=10").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(id("https://www.youtube.com/shorts/abc_DEF-123").as_deref(), Some("abc_DEF-123"));
        assert_eq!(id("https://www.youtube.com/embed/dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));

        assert_eq!(id("https://www.youtube.com/@channel"), None);
        assert_eq!(id("https://www.youtube.com/watch"), None);
        assert_eq!(id("https://youtu.be/"), None);
        assert_eq!(id("https://notyoutube.com/watch?v=abc"), None);
    }

    #[test]
    fn test_render_embeds_video() {
        let raw = r#"{"videoTitle": "Rust in 100 Seconds", "channel": "Fireship",
                      "summary": "A whirlwind tour.", "keyPoints": ["Ownership"], "topics": ["rust"]}"#;
        let source = SourceMetadata {
            url: "https://www.youtube.com/watch?v=5C_HPTJg5ek".to_string(),
            image: Some("https://i.ytimg.com/vi/5C_HPTJg5ek/hqdefault.jpg".to_string()),
            ..Default::default()
        };
        let note = YouTubeHandler::new().note_content(raw, &source).unwrap();

        assert!(note.starts_with(
            "# Rust in 100 Seconds\n\n[Watch on YouTube](https://www.youtube.com/watch?v=5C_HPTJg5ek)\n\n<iframe"
        ));
        assert!(note.contains("src=\"https://www.youtube.com/embed/5C_HPTJg5ek\""));
        assert!(!note.contains("hqdefault.jpg"));
        assert!(note.contains("**Channel:** Fireship"));
        assert!(note.ends_with("## Topics\n\n- rust\n"));
    }

    #[test]
    fn test_incomplete_video() {
        let err = YouTubeHandler::new()
            .extract(r#"{"videoTitle": "Empty"}"#)
            .unwrap_err();
        assert!(matches!(err, ImportError::IncompleteExtraction(_)));
    }

    #[test]
    fn test_sentinel_rejected() {
        let handler = YouTubeHandler::new();
        assert!(handler.prompt("Body").unwrap().contains("\"Not a video\""));

        let err = handler
            .extract(r#"{"videoTitle": "Not a video", "summary": "A channel page."}"#)
            .unwrap_err();
        assert!(matches!(err, ImportError::NotInCategory(ref c) if c == "video"));
    }
}
