//! Response text extraction across provider body shapes

use crate::error::ImportError;
use serde_json::Value;

/// JSON pointers tried in order; the first non-empty string wins
const TEXT_POINTERS: &[&str] = &[
    "/choices/0/message/content",
    "/choices/0/content",
    "/choices/0/text",
    "/candidates/0/content/parts/0/text",
    "/content",
    "/text",
    "/response",
    "/message/content",
];

/// Pull the generated text out of a provider response body
///
/// Accepts chat-completion, legacy completion, Gemini, Ollama and a handful
/// of flat shapes. A body that is not JSON at all is returned as-is when
/// non-empty, since some local servers answer in plain text.
pub fn extract_response_text(provider: &str, body: &str) -> Result<String, ImportError> {
    let value = match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        Err(_) => {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                return Err(ImportError::InvalidResponseFormat(provider.to_string()));
            }
            return Ok(trimmed.to_string());
        }
    };

    if let Some(text) = value.as_str() {
        return non_empty(text).ok_or_else(|| ImportError::InvalidResponseFormat(provider.to_string()));
    }

    TEXT_POINTERS
        .iter()
        .filter_map(|pointer| value.pointer(pointer))
        .filter_map(Value::as_str)
        .find_map(non_empty)
        .ok_or_else(|| ImportError::InvalidResponseFormat(provider.to_string()))
}

fn non_empty(text: &str) -> Option<String> {
    (!text.trim().is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_completion_shape() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "hello"}}]}"#;
        assert_eq!(extract_response_text("openai", body).unwrap(), "hello");
    }

    #[test]
    fn test_alternate_shapes() {
        let cases = [
            r#"{"choices": [{"content": "a"}]}"#,
            r#"{"choices": [{"text": "a"}]}"#,
            r#"{"candidates": [{"content": {"parts": [{"text": "a"}]}}]}"#,
            r#"{"content": "a"}"#,
            r#"{"text": "a"}"#,
            r#"{"response": "a"}"#,
            r#"{"message": {"content": "a"}}"#,
            r#""a""#,
        ];
        for body in cases {
            assert_eq!(extract_response_text("p", body).unwrap(), "a", "body: {body}");
        }
    }

    #[test]
    fn test_plain_text_body() {
        assert_eq!(
            extract_response_text("local", "  movie \n").unwrap(),
            "movie"
        );
    }

    #[test]
    fn test_unrecognized_shapes() {
        for body in [r#"{"foo": "bar"}"#, r#"{"choices": []}"#, "", r#"{"content": "  "}"#] {
            let err = extract_response_text("openai", body).unwrap_err();
            assert!(
                matches!(err, ImportError::InvalidResponseFormat(ref p) if p == "openai"),
                "body: {body}"
            );
        }
    }

    #[test]
    fn test_skips_empty_candidates() {
        let body = r#"{"choices": [{"message": {"content": ""}, "text": "fallback"}]}"#;
        assert_eq!(extract_response_text("p", body).unwrap(), "fallback");
    }
}
