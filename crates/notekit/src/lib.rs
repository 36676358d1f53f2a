//! NoteKit - turn web pages into structured Markdown notes
//!
//! Given a URL, NoteKit works out what kind of content it points at, asks an
//! LLM to extract structured data from the page, and renders the result as a
//! Markdown note for a note-taking host.
//!
//! ## Content Type Detection
//!
//! The [`ContentTypeRegistry`] holds [`ContentTypeHandler`]s in priority
//! order and detects in two phases: cheap URL pattern matching first, then
//! LLM classification of the page text for URLs no pattern claims. Results
//! are cached per URL.
//!
//! Built-in handlers:
//! - [`YouTubeHandler`] - YouTube videos
//! - [`MediumHandler`] - Medium and Medium-hosted publications
//! - [`MovieHandler`] - IMDb, TMDB, Letterboxd and Rotten Tomatoes pages
//! - [`RecipeHandler`] - recipe sites and recipe-like pages
//! - [`GenericHandler`] - everything else
//!
//! ## LLM Providers
//!
//! [`LlmProvider`] implementations share one retry and error path:
//! - [`OpenAiCompatibleProvider`] - OpenAI, OpenRouter, Requesty, local servers
//! - [`GeminiProvider`] - Google Gemini
//! - [`OllamaProvider`] - Ollama
//!
//! API keys never appear in returned errors or log output.
//!
//! ## Example
//!
//! ```no_run
//! use notekit::{NoteImporter, Settings};
//!
//! # async fn run() -> Result<(), notekit::ImportError> {
//! let settings = Settings::from_json_str(r#"{"provider": "ollama", "model": "llama3.1"}"#)?;
//! let importer = NoteImporter::from_settings(&settings)?;
//! let note = importer.import("https://www.imdb.com/title/tt0133093/").await?;
//! println!("{}\n\n{}", note.path(), note.content);
//! # Ok(())
//! # }
//! ```

mod config;
mod convert;
mod error;
mod fetch;
pub mod handlers;
mod importer;
mod logger;
pub mod providers;
mod redact;
mod registry;
pub mod retry;

pub use config::{
    ProviderKind, Settings, CONTENT_PLACEHOLDER, DEFAULT_MAX_TOKENS, DEFAULT_OUTPUT_FOLDER,
    DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_MS,
};
pub use convert::{extract_page_metadata, html_to_text, PageMetadata};
pub use error::ImportError;
pub use fetch::{FetchedPage, HttpPageFetcher, PageFetcher};
pub use handlers::{
    ContentTypeHandler, GenericHandler, LlmOutput, MediumHandler, MovieHandler, RecipeHandler,
    SourceMetadata, YouTubeHandler,
};
pub use importer::{note_file_name, ImportedNote, NoteImporter, NoteImporterBuilder};
pub use logger::{LogLevel, LogSink, Logger, MemorySink, TracingSink};
pub use providers::{
    create_provider, CallOptions, GeminiProvider, LlmProvider, ModelInfo, OllamaProvider,
    OpenAiCompatibleProvider, OpenAiFlavor, ProviderConfig,
};
pub use redact::{redact_api_key, REDACTED};
pub use registry::{normalize_classification, ContentTypeRegistry};
pub use retry::{RetryExhausted, RetryPolicy};

/// Default User-Agent string
pub const DEFAULT_USER_AGENT: &str = "NoteKit/1.0";
