//! End-to-end import of one URL into a note

use crate::config::Settings;
use crate::error::ImportError;
use crate::fetch::{FetchedPage, HttpPageFetcher, PageFetcher};
use crate::handlers::{default_handlers, ContentTypeHandler, GenericHandler, GENERIC_TYPE};
use crate::logger::Logger;
use crate::providers::{create_provider, CallOptions, LlmProvider};
use crate::registry::ContentTypeRegistry;
use serde::Serialize;
use std::sync::Arc;

/// Longest file name stem, in characters
pub const MAX_FILE_NAME_CHARS: usize = 100;

/// Characters the host cannot use in file names
const FORBIDDEN_FILE_NAME_CHARS: &[char] =
    &['\\', '/', ':', '*', '?', '"', '<', '>', '|', '#', '^', '[', ']'];

/// A rendered note ready to be written by the host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportedNote {
    pub title: String,
    pub content_type: String,
    /// Destination folder, relative to the vault root
    pub folder: String,
    /// Sanitized file name including the `.md` extension
    pub file_name: String,
    /// Markdown body
    pub content: String,
}

impl ImportedNote {
    /// `folder/file_name`
    pub fn path(&self) -> String {
        if self.folder.is_empty() {
            self.file_name.clone()
        } else {
            format!("{}/{}", self.folder, self.file_name)
        }
    }
}

/// Builder for [`NoteImporter`]
#[derive(Default)]
pub struct NoteImporterBuilder {
    fetcher: Option<Arc<dyn PageFetcher>>,
    provider: Option<Arc<dyn LlmProvider>>,
    logger: Option<Logger>,
    output_folder: Option<String>,
    handlers: Vec<Arc<dyn ContentTypeHandler>>,
    generic_prompt_template: Option<String>,
}

impl NoteImporterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page fetcher (defaults to [`HttpPageFetcher`])
    pub fn fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// LLM provider used for classification and extraction
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Root folder for notes (defaults to `Imports`)
    pub fn output_folder(mut self, folder: impl Into<String>) -> Self {
        self.output_folder = Some(folder.into());
        self
    }

    /// Register a custom handler ahead of the built-in ones
    pub fn handler(mut self, handler: Arc<dyn ContentTypeHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Replace the generic handler's prompt; must contain `{{content}}`
    pub fn generic_prompt_template(mut self, template: impl Into<String>) -> Self {
        self.generic_prompt_template = Some(template.into());
        self
    }

    /// Build the importer
    pub fn build(self) -> Result<NoteImporter, ImportError> {
        let logger = self.logger.unwrap_or_default();
        let fetcher: Arc<dyn PageFetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpPageFetcher::new()),
        };

        let generic: Option<Arc<dyn ContentTypeHandler>> = match self.generic_prompt_template {
            Some(template) => Some(Arc::new(GenericHandler::with_template(template)?)),
            None => None,
        };

        let mut registry =
            ContentTypeRegistry::new(fetcher, logger.clone()).with_provider(self.provider.clone());
        for handler in self.handlers {
            registry.register(handler);
        }
        for handler in default_handlers() {
            match &generic {
                Some(custom) if handler.content_type() == GENERIC_TYPE => {
                    registry.register(custom.clone())
                }
                _ => registry.register(handler),
            }
        }

        Ok(NoteImporter {
            registry,
            provider: self.provider,
            logger,
            output_folder: self
                .output_folder
                .unwrap_or_else(|| crate::config::DEFAULT_OUTPUT_FOLDER.to_string()),
        })
    }
}

/// Turns URLs into notes: detect, fetch, prompt, extract, render
pub struct NoteImporter {
    registry: ContentTypeRegistry,
    provider: Option<Arc<dyn LlmProvider>>,
    logger: Logger,
    output_folder: String,
}

impl NoteImporter {
    pub fn builder() -> NoteImporterBuilder {
        NoteImporterBuilder::new()
    }

    /// Importer wired from host settings with the HTTP fetcher
    pub fn from_settings(settings: &Settings) -> Result<Self, ImportError> {
        settings.validate()?;

        let logger = Logger::default();
        logger.set_debug(settings.debug);

        let provider = create_provider(settings, logger.clone())?;
        let mut builder = Self::builder()
            .provider(provider)
            .logger(logger)
            .output_folder(settings.default_output_folder.clone());
        if let Some(template) = settings
            .prompt_template_override
            .as_deref()
            .filter(|t| !t.trim().is_empty())
        {
            builder = builder.generic_prompt_template(template);
        }
        builder.build()
    }

    pub fn registry(&self) -> &ContentTypeRegistry {
        &self.registry
    }

    pub fn provider(&self) -> Option<&Arc<dyn LlmProvider>> {
        self.provider.as_ref()
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn output_folder(&self) -> &str {
        &self.output_folder
    }

    /// Import `url` as a note
    ///
    /// Errors are redacted with the provider's credential before they are
    /// logged or returned.
    pub async fn import(&self, url: &str) -> Result<ImportedNote, ImportError> {
        let secret = self
            .provider
            .as_ref()
            .map(|p| p.config().api_key.clone())
            .unwrap_or_default();

        match self.run(url).await {
            Ok(note) => {
                self.logger.info(format!(
                    "Imported {} as {} note: {}",
                    url,
                    note.content_type,
                    note.path()
                ));
                Ok(note)
            }
            Err(e) => {
                let e = e.redact(&secret);
                self.logger.error(format!("Import failed for {}: {}", url, e));
                Err(e)
            }
        }
    }

    async fn run(&self, url: &str) -> Result<ImportedNote, ImportError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or(ImportError::ProviderNotConfigured)?;

        let handler = self.registry.detect_content_type(url).await?;
        self.logger.debug(format!(
            "Using {} handler for {}",
            handler.content_type(),
            url
        ));

        let page = self.registry.page_content(url).await?;
        let prompt = handler.prompt(&prompt_content(&page))?;
        let raw = provider.call_llm(&prompt, &CallOptions::default()).await?;
        self.logger
            .debug(format!("LLM response: {} chars", raw.chars().count()));

        let output = handler.extract(&raw)?;
        let content = handler.render_note(&output, &page.metadata())?;
        let title = output.title().trim().to_string();

        Ok(ImportedNote {
            file_name: note_file_name(&title),
            title,
            content_type: handler.content_type().to_string(),
            folder: join_folder(&self.output_folder, handler.folder_name()),
            content,
        })
    }
}

/// Page title and description ahead of the body text
fn prompt_content(page: &FetchedPage) -> String {
    let mut parts = Vec::new();
    if let Some(title) = page.title.as_deref().filter(|t| !t.trim().is_empty()) {
        parts.push(format!("Title: {}", title.trim()));
    }
    if let Some(description) = page.description.as_deref().filter(|d| !d.trim().is_empty()) {
        parts.push(format!("Description: {}", description.trim()));
    }
    if !page.text.trim().is_empty() {
        parts.push(page.text.trim().to_string());
    }
    parts.join("\n\n")
}

/// `root/sub` without doubled or trailing slashes
fn join_folder(root: &str, sub: &str) -> String {
    let root = root.trim().trim_matches('/');
    if root.is_empty() {
        sub.to_string()
    } else {
        format!("{root}/{sub}")
    }
}

/// File name for a note titled `title`
///
/// Strips characters the host rejects, collapses whitespace and caps the
/// length; an empty result becomes `Untitled`.
pub fn note_file_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| !FORBIDDEN_FILE_NAME_CHARS.contains(c) && !c.is_control())
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let capped: String = collapsed.chars().take(MAX_FILE_NAME_CHARS).collect();
    let stem = capped.trim_end().trim_end_matches('.');

    if stem.is_empty() {
        "Untitled.md".to_string()
    } else {
        format!("{stem}.md")
    }
}
