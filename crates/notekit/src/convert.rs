//! HTML to text conversion and page metadata extraction

/// Elements whose content never reaches the text output
const SKIP_TAGS: &[&str] = &["script", "style", "noscript", "iframe", "svg", "template"];

/// Elements that end a line in the text output
const NEWLINE_TAGS: &[&str] = &[
    "p", "div", "br", "h1", "h2", "h3", "h4", "h5", "h6", "li", "tr", "section", "article",
    "header", "footer", "blockquote", "pre",
];

/// Metadata read from a page's `<head>`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub site_name: Option<String>,
}

/// Check if content is HTML based on content type and body
pub fn is_html(content_type: &Option<String>, body: &str) -> bool {
    if let Some(ct) = content_type {
        let ct_lower = ct.to_lowercase();
        if ct_lower.contains("text/html") || ct_lower.contains("application/xhtml") {
            return true;
        }
    }

    let trimmed = body.trim_start();
    let head: String = trimmed.chars().take(15).collect::<String>().to_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

/// Convert HTML to plain text
pub fn html_to_text(html: &str) -> String {
    let mut output = String::new();
    let mut skip_elements: Vec<String> = Vec::new();

    let mut chars = html.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '<' {
            let tag = read_tag(&mut chars);
            let (tag_name, is_closing) = tag_name(&tag);

            if tag_name.starts_with("!--") {
                skip_comment(&tag, &mut chars);
                continue;
            }

            if SKIP_TAGS.contains(&tag_name.as_str()) {
                if is_closing {
                    if let Some(pos) = skip_elements.iter().rposition(|t| *t == tag_name) {
                        skip_elements.remove(pos);
                    }
                } else if !tag.ends_with('/') {
                    skip_elements.push(tag_name);
                }
                continue;
            }

            if !skip_elements.is_empty() {
                continue;
            }

            if NEWLINE_TAGS.contains(&tag_name.as_str())
                && (is_closing || tag_name == "br" || is_heading_or_paragraph(&tag_name))
            {
                output.push('\n');
            }
        } else if skip_elements.is_empty() {
            output.push(decode_entity(c, &mut chars));
        }
    }

    clean_whitespace(&output)
}

/// Read `<title>`, `og:*` and description meta tags
pub fn extract_page_metadata(html: &str) -> PageMetadata {
    let mut metadata = PageMetadata::default();
    let mut og_title = None;
    let mut html_title = None;

    let mut chars = html.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '<' {
            continue;
        }
        let tag = read_tag(&mut chars);
        let (name, is_closing) = tag_name(&tag);
        if is_closing {
            if name == "head" {
                break;
            }
            continue;
        }

        match name.as_str() {
            "title" if html_title.is_none() => {
                let mut text = String::new();
                while let Some(next) = chars.next() {
                    if next == '<' {
                        break;
                    }
                    text.push(decode_entity(next, &mut chars));
                }
                html_title = non_empty(clean_whitespace(&text));
            }
            "meta" => {
                let key = extract_attribute(&tag, "property")
                    .or_else(|| extract_attribute(&tag, "name"))
                    .map(|k| k.to_lowercase());
                let content = extract_attribute(&tag, "content")
                    .map(|v| clean_whitespace(&decode_entities(&v)))
                    .and_then(non_empty);
                let (Some(key), Some(content)) = (key, content) else {
                    continue;
                };
                match key.as_str() {
                    "og:title" | "twitter:title" => {
                        og_title.get_or_insert(content);
                    }
                    "og:description" | "description" | "twitter:description" => {
                        metadata.description.get_or_insert(content);
                    }
                    "og:image" | "twitter:image" => {
                        metadata.image.get_or_insert(content);
                    }
                    "og:site_name" => {
                        metadata.site_name.get_or_insert(content);
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    metadata.title = og_title.or(html_title);
    metadata
}

/// Truncate to `max_chars` characters, appending `...` when cut
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

fn read_tag(chars: &mut std::iter::Peekable<std::str::Chars>) -> String {
    let mut tag = String::new();
    for next in chars.by_ref() {
        if next == '>' {
            break;
        }
        tag.push(next);
    }
    tag
}

fn tag_name(tag: &str) -> (String, bool) {
    let tag_lower = tag.to_lowercase();
    let is_closing = tag_lower.starts_with('/');
    let body = tag_lower.trim_start_matches('/');
    let name = body
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or("")
        .to_string();
    (name, is_closing)
}

/// Consume the rest of an HTML comment if `read_tag` stopped early
fn skip_comment(tag: &str, chars: &mut std::iter::Peekable<std::str::Chars>) {
    if tag.ends_with("--") {
        return;
    }
    let mut tail = String::new();
    for next in chars.by_ref() {
        tail.push(next);
        if tail.ends_with("-->") {
            break;
        }
    }
}

fn is_heading_or_paragraph(tag_name: &str) -> bool {
    matches!(tag_name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "p")
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Extract attribute value from tag
fn extract_attribute(tag: &str, attr: &str) -> Option<String> {
    // ASCII lowercasing keeps byte offsets aligned with `tag`
    let tag_lower = tag.to_ascii_lowercase();
    let pattern = format!("{}=", attr);

    let mut search_from = 0;
    while let Some(found) = tag_lower[search_from..].find(&pattern) {
        let start = search_from + found;
        search_from = start + pattern.len();

        // Must be a whole attribute name, not the tail of another one
        let preceded_ok = tag_lower[..start]
            .chars()
            .next_back()
            .map_or(true, |c| c.is_whitespace());
        if !preceded_ok {
            continue;
        }

        let rest = tag[start + pattern.len()..].trim_start();
        if let Some(rest) = rest.strip_prefix('"') {
            return rest.find('"').map(|end| rest[..end].to_string());
        } else if let Some(rest) = rest.strip_prefix('\'') {
            return rest.find('\'').map(|end| rest[..end].to_string());
        } else {
            let end = rest
                .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
                .unwrap_or(rest.len());
            return Some(rest[..end].to_string());
        }
    }
    None
}

fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(decode_entity(c, &mut chars));
    }
    out
}

/// Decode HTML entity starting from ampersand
fn decode_entity(c: char, chars: &mut std::iter::Peekable<std::str::Chars>) -> char {
    if c != '&' {
        return c;
    }

    let mut entity = String::new();
    while let Some(&next) = chars.peek() {
        if next == ';' {
            chars.next();
            break;
        }
        if next.is_whitespace() || entity.len() > 10 {
            return '&';
        }
        entity.push(next);
        chars.next();
    }

    match entity.as_str() {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" | "#39" => '\'',
        "nbsp" => ' ',
        "mdash" => '—',
        "ndash" => '–',
        "hellip" => '…',
        "rsquo" => '’',
        "lsquo" => '‘',
        "rdquo" => '”',
        "ldquo" => '“',
        "copy" => '©',
        "reg" => '®',
        _ => {
            if let Some(num_str) = entity.strip_prefix('#') {
                let code = match num_str.strip_prefix(['x', 'X']) {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => num_str.parse::<u32>().ok(),
                };
                if let Some(ch) = code.and_then(char::from_u32) {
                    return ch;
                }
            }
            '&'
        }
    }
}

/// Clean whitespace: collapse runs, trim, keep max 2 newlines
fn clean_whitespace(s: &str) -> String {
    let mut result = String::new();
    let mut last_was_space = false;
    let mut newline_count = 0;

    for c in s.chars() {
        if c == '\n' {
            if last_was_space && result.ends_with(' ') {
                result.pop();
            }
            newline_count += 1;
            last_was_space = true;
            if newline_count <= 2 {
                result.push(c);
            }
        } else if c.is_whitespace() {
            if !last_was_space {
                result.push(' ');
                last_was_space = true;
            }
        } else {
            newline_count = 0;
            last_was_space = false;
            result.push(c);
        }
    }

    result.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_html_by_content_type() {
        assert!(is_html(&Some("text/html".to_string()), ""));
        assert!(is_html(&Some("text/html; charset=utf-8".to_string()), ""));
        assert!(is_html(&Some("application/xhtml+xml".to_string()), ""));
        assert!(!is_html(&Some("text/plain".to_string()), ""));
        assert!(!is_html(&Some("application/json".to_string()), ""));
    }

    #[test]
    fn test_is_html_by_body() {
        assert!(is_html(&None, "<!DOCTYPE html><html>"));
        assert!(is_html(&None, "  <!doctype html>"));
        assert!(is_html(&None, "<html><body>"));
        assert!(!is_html(&None, "Hello world"));
        assert!(!is_html(&None, "{\"json\": true}"));
    }

    #[test]
    fn test_html_to_text_simple() {
        let html = "<p>Hello</p><p>World</p>";
        let text = html_to_text(html);
        assert!(text.contains("Hello"));
        assert!(text.contains("World"));
    }

    #[test]
    fn test_html_to_text_skips_scripts_and_comments() {
        let html = "<p>Before</p><script>alert('bad');</script><!-- hidden <b>note</b> --><p>After</p>";
        let text = html_to_text(html);
        assert!(text.contains("Before"));
        assert!(text.contains("After"));
        assert!(!text.contains("alert"));
        assert!(!text.contains("hidden"));
    }

    #[test]
    fn test_entity_decoding() {
        let html = "<p>&amp; &lt; &gt; &quot; &apos; &nbsp; &mdash; &#8212; &#x41;</p>";
        let text = html_to_text(html);
        assert!(text.contains('&'));
        assert!(text.contains('<'));
        assert!(text.contains('>'));
        assert!(text.contains('"'));
        assert!(text.contains('\''));
        assert!(text.contains('—'));
        assert!(text.contains('A'));
    }

    #[test]
    fn test_clean_whitespace() {
        let input = "  hello   world  \n\n\n\n  test  ";
        assert_eq!(clean_whitespace(input), "hello world\n\ntest");
    }

    #[test]
    fn test_extract_attribute() {
        assert_eq!(
            extract_attribute("a href=\"https://example.com\" class=\"link\"", "href"),
            Some("https://example.com".to_string())
        );
        assert_eq!(
            extract_attribute("img src='image.png'", "src"),
            Some("image.png".to_string())
        );
        assert_eq!(
            extract_attribute("div class=test", "class"),
            Some("test".to_string())
        );
        assert_eq!(
            extract_attribute("meta data-name=\"x\" name=\"description\"", "name"),
            Some("description".to_string())
        );
    }

    #[test]
    fn test_extract_page_metadata() {
        let html = r#"<!DOCTYPE html>
<html><head>
<title>Fallback &amp; Title</title>
<meta property="og:title" content="Classic Pancakes">
<meta name="description" content="Fluffy pancakes in 20 minutes">
<meta property="og:image" content="https://cdn.example.com/pancakes.jpg" />
<meta property="og:site_name" content="Example Kitchen">
</head><body><meta property="og:title" content="Ignored"></body></html>"#;

        let metadata = extract_page_metadata(html);
        assert_eq!(metadata.title.as_deref(), Some("Classic Pancakes"));
        assert_eq!(
            metadata.description.as_deref(),
            Some("Fluffy pancakes in 20 minutes")
        );
        assert_eq!(
            metadata.image.as_deref(),
            Some("https://cdn.example.com/pancakes.jpg")
        );
        assert_eq!(metadata.site_name.as_deref(), Some("Example Kitchen"));
    }

    #[test]
    fn test_metadata_title_fallback() {
        let metadata = extract_page_metadata("<html><head><title> Just &amp; Title </title></head></html>");
        assert_eq!(metadata.title.as_deref(), Some("Just & Title"));
        assert!(metadata.image.is_none());
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo...");
        assert_eq!(truncate_chars("exact", 5), "exact");
    }
}
