//! Locating a JSON object inside free-form LLM text

use crate::convert::truncate_chars;
use crate::error::ImportError;
use serde::de::DeserializeOwned;

/// Find and parse the JSON object in `raw`
///
/// Tries, in order: a ```json fence, an unlabeled fence whose body starts
/// with `{`, the object enclosing the first `"anchor"` key, and finally the
/// whole text if it is itself an object.
pub fn parse_json_object<T: DeserializeOwned>(raw: &str, anchor: &str) -> Result<T, ImportError> {
    let json = locate_json(raw, anchor).ok_or_else(|| {
        ImportError::Parse(format!(
            "no JSON object found in response: {}",
            truncate_chars(raw.trim(), 200)
        ))
    })?;

    serde_json::from_str(json).map_err(|e| ImportError::Parse(format!("invalid JSON: {e}")))
}

/// Return the JSON object text in `raw`, if any
pub fn locate_json<'a>(raw: &'a str, anchor: &str) -> Option<&'a str> {
    from_fence(raw)
        .or_else(|| from_anchor(raw, anchor))
        .or_else(|| {
            let trimmed = raw.trim();
            trimmed.starts_with('{').then_some(trimmed)
        })
}

fn from_fence(raw: &str) -> Option<&str> {
    // Odd-indexed pieces are fence bodies
    let bodies: Vec<&str> = raw.split("```").skip(1).step_by(2).collect();

    let labeled = bodies.iter().find_map(|body| {
        let (label, rest) = body.split_once('\n')?;
        label.trim().eq_ignore_ascii_case("json").then(|| rest.trim())
    });
    labeled.or_else(|| {
        bodies
            .iter()
            .map(|body| body.trim())
            .find(|body| body.starts_with('{'))
    })
}

fn from_anchor<'a>(raw: &'a str, anchor: &str) -> Option<&'a str> {
    let key = format!("\"{anchor}\"");
    let key_pos = raw.find(&key)?;

    // Innermost object whose closing brace lies past the key
    raw[..key_pos]
        .match_indices('{')
        .rev()
        .find_map(|(start, _)| {
            let end = start + matching_brace(&raw[start..])?;
            (end > key_pos).then(|| &raw[start..=end])
        })
}

/// Byte offset of the brace closing the one at offset 0
fn matching_brace(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_labeled_fence() {
        let raw = "Here you go:\n```json\n{\"movieTitle\": \"Heat\"}\n```\nEnjoy!";
        assert_eq!(locate_json(raw, "movieTitle"), Some("{\"movieTitle\": \"Heat\"}"));
    }

    #[test]
    fn test_labeled_fence_preferred_over_earlier_plain_fence() {
        let raw = "```\n{\"a\": 1}\n```\n```json\n{\"b\": 2}\n```";
        assert_eq!(locate_json(raw, "b"), Some("{\"b\": 2}"));
    }

    #[test]
    fn test_unlabeled_fence() {
        let raw = "```\n{\"recipeName\": \"Soup\"}\n```";
        assert_eq!(locate_json(raw, "recipeName"), Some("{\"recipeName\": \"Soup\"}"));
    }

    #[test]
    fn test_bare_object_with_surrounding_prose() {
        let raw = r#"Sure! {"title": "A {braced} title", "summary": "He said \"}\""} Hope that helps."#;
        let value: Value = parse_json_object(raw, "title").unwrap();
        assert_eq!(value["title"], "A {braced} title");
        assert_eq!(value["summary"], "He said \"}\"");
    }

    #[test]
    fn test_anchor_finds_enclosing_object() {
        let raw = r#"{"meta": {"x": 1}, "videoTitle": "Talk"}"#;
        let value: Value = parse_json_object(raw, "videoTitle").unwrap();
        assert_eq!(value["videoTitle"], "Talk");
    }

    #[test]
    fn test_no_json() {
        let err = parse_json_object::<Value>("I could not find anything.", "title").unwrap_err();
        assert!(matches!(err, ImportError::Parse(_)));
    }

    #[test]
    fn test_invalid_json() {
        let err = parse_json_object::<Value>("```json\n{\"title\": }\n```", "title").unwrap_err();
        assert!(err.to_string().contains("invalid JSON"));
    }

    #[test]
    fn test_unbalanced_braces() {
        assert_eq!(locate_json(r#"prefix {"title": "x""#, "title"), None);
    }
}
