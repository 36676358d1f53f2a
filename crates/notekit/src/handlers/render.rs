//! Markdown note assembly

use super::output::is_blank;
use std::fmt::Write;

/// Incremental Markdown note writer
///
/// Fields and sections with no data (empty, or "Not specified") are
/// skipped, so callers can add everything unconditionally.
#[derive(Debug, Default)]
pub struct NoteBuilder {
    out: String,
}

impl NoteBuilder {
    /// Start a note with a level-one heading
    pub fn new(title: &str) -> Self {
        let mut builder = Self::default();
        let _ = writeln!(builder.out, "# {}\n", title.trim());
        builder
    }

    /// `[label](url)` line
    pub fn link(mut self, label: &str, url: &str) -> Self {
        if !url.trim().is_empty() {
            let _ = writeln!(self.out, "[{}]({})\n", label, url.trim());
        }
        self
    }

    /// `![alt](src)` line
    pub fn image(mut self, alt: &str, src: Option<&str>) -> Self {
        if let Some(src) = src.map(str::trim).filter(|s| !s.is_empty()) {
            let _ = writeln!(self.out, "![{}]({})\n", alt.trim(), src);
        }
        self
    }

    /// Raw block, e.g. an embed
    pub fn block(mut self, text: &str) -> Self {
        if !text.trim().is_empty() {
            let _ = writeln!(self.out, "{}\n", text.trim());
        }
        self
    }

    /// `**label:** value` line
    pub fn field(mut self, label: &str, value: &str) -> Self {
        if !is_blank(value) {
            let _ = writeln!(self.out, "**{}:** {}", label, value.trim());
        }
        self
    }

    /// `**label:** a, b, c` line
    pub fn field_list(self, label: &str, values: &[String]) -> Self {
        let joined = present(values).collect::<Vec<_>>().join(", ");
        self.field(label, &joined)
    }

    /// Blank line closing a run of fields
    pub fn end_fields(mut self) -> Self {
        if !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
        self
    }

    /// `## heading` followed by a paragraph
    pub fn paragraph(mut self, heading: &str, text: &str) -> Self {
        if !is_blank(text) {
            let _ = writeln!(self.out, "## {}\n\n{}\n", heading, text.trim());
        }
        self
    }

    /// `## heading` followed by a bullet list
    pub fn bullets(mut self, heading: &str, items: &[String]) -> Self {
        let items: Vec<&str> = present(items).collect();
        if !items.is_empty() {
            let _ = writeln!(self.out, "## {}\n", heading);
            for item in items {
                let _ = writeln!(self.out, "- {}", item);
            }
            self.out.push('\n');
        }
        self
    }

    /// `## heading` followed by a numbered list
    pub fn numbered(mut self, heading: &str, items: &[String]) -> Self {
        let items: Vec<&str> = present(items).collect();
        if !items.is_empty() {
            let _ = writeln!(self.out, "## {}\n", heading);
            for (i, item) in items.iter().enumerate() {
                let _ = writeln!(self.out, "{}. {}", i + 1, item);
            }
            self.out.push('\n');
        }
        self
    }

    /// `## heading` followed by block quotes
    pub fn quotes(mut self, heading: &str, items: &[String]) -> Self {
        let items: Vec<&str> = present(items).collect();
        if !items.is_empty() {
            let _ = writeln!(self.out, "## {}\n", heading);
            for item in items {
                let _ = writeln!(self.out, "> {}\n", item);
            }
        }
        self
    }

    /// Finished note with exactly one trailing newline
    pub fn finish(self) -> String {
        let mut out = self.out.trim_end().to_string();
        out.push('\n');
        out
    }
}

fn present(items: &[String]) -> impl Iterator<Item = &str> {
    items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !is_blank(item))
}
