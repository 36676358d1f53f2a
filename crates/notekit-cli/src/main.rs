//! NoteKit CLI - Command-line interface for importing web pages as notes

use clap::{Args, Parser, Subcommand, ValueEnum};
use notekit::{
    create_provider, ContentTypeRegistry, HttpPageFetcher, ImportedNote, Logger, NoteImporter,
    ProviderKind, Settings,
};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Output format for the import subcommand
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// Markdown with YAML frontmatter
    #[default]
    Md,
    /// JSON format
    Json,
}

/// NoteKit - turn web pages into structured Markdown notes
#[derive(Parser, Debug)]
#[command(name = "notekit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    settings: SettingsArgs,
}

/// Settings file plus per-field overrides
#[derive(Args, Debug, Default)]
struct SettingsArgs {
    /// Settings JSON file (camelCase keys, as stored by the host)
    #[arg(long, global = true, env = "NOTEKIT_CONFIG")]
    config: Option<PathBuf>,

    /// LLM provider: openai, openrouter, requesty, gemini, ollama, local
    #[arg(long, global = true, env = "NOTEKIT_PROVIDER")]
    provider: Option<ProviderKind>,

    /// Provider API key
    #[arg(long, global = true, env = "NOTEKIT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Provider endpoint override
    #[arg(long, global = true, env = "NOTEKIT_ENDPOINT")]
    endpoint: Option<String>,

    /// Model override
    #[arg(long, global = true, env = "NOTEKIT_MODEL")]
    model: Option<String>,

    /// Root folder for imported notes
    #[arg(long, global = true, env = "NOTEKIT_OUTPUT_FOLDER")]
    output_folder: Option<String>,

    /// Per-request timeout in milliseconds
    #[arg(long, global = true, env = "NOTEKIT_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Verbose diagnostic logging
    #[arg(long, global = true, env = "NOTEKIT_DEBUG")]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import URL and print the note
    Import {
        /// URL to import
        url: String,

        /// Output format
        #[arg(long, short, default_value = "md")]
        output: OutputFormat,

        /// Also write the note under this directory (at its folder/file path)
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Print the content type detected for URL
    Detect {
        /// URL to classify
        url: String,
    },
    /// List models offered by the configured provider
    Models,
    /// Check that the configured provider is reachable
    Check,
    /// Print the JSON schema of the settings object
    ConfigSchema,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.settings.debug);

    let Some(command) = cli.command else {
        eprintln!("Usage: notekit import <URL>");
        eprintln!("   or: notekit detect <URL>");
        eprintln!("   or: notekit --help");
        std::process::exit(1);
    };

    match command {
        Commands::Import { url, output, save } => {
            let settings = load_settings(&cli.settings);
            run_import(&settings, &url, output, save).await
        }
        Commands::Detect { url } => run_detect(&load_settings(&cli.settings), &url).await,
        Commands::Models => run_models(&load_settings(&cli.settings)).await,
        Commands::Check => run_check(&load_settings(&cli.settings)).await,
        Commands::ConfigSchema => print_json(&Settings::json_schema()),
    }
}

fn load_settings(args: &SettingsArgs) -> Settings {
    args.load().unwrap_or_else(|e| fail(&e))
}

/// Log to stderr; `RUST_LOG` wins over `--debug`
fn init_tracing(debug: bool) {
    let default = if debug { "notekit=debug" } else { "notekit=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

impl SettingsArgs {
    /// Settings file (or defaults) with command-line overrides applied
    fn load(&self) -> Result<Settings, String> {
        let mut settings = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
                Settings::from_json_str(&json).map_err(|e| e.to_string())?
            }
            None => Settings::default(),
        };

        if let Some(provider) = self.provider {
            settings.provider = provider;
        }
        if let Some(ref api_key) = self.api_key {
            settings.api_key = api_key.clone();
        }
        if let Some(ref endpoint) = self.endpoint {
            settings.endpoint = Some(endpoint.clone());
        }
        if let Some(ref model) = self.model {
            settings.model = Some(model.clone());
        }
        if let Some(ref folder) = self.output_folder {
            settings.default_output_folder = folder.clone();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            settings.timeout_ms = timeout_ms;
        }
        settings.debug |= self.debug;

        settings.validate().map_err(|e| e.to_string())?;
        Ok(settings)
    }
}

async fn run_import(settings: &Settings, url: &str, output: OutputFormat, save: Option<PathBuf>) {
    let importer = NoteImporter::from_settings(settings).unwrap_or_else(|e| fail(&e.to_string()));
    let note = importer
        .import(url)
        .await
        .unwrap_or_else(|e| fail(&e.to_string()));

    if let Some(dir) = save {
        match save_note(&dir, &note) {
            Ok(path) => eprintln!("Saved {}", path.display()),
            Err(e) => fail(&format!("Failed to save note: {}", e)),
        }
    }

    match output {
        OutputFormat::Md => writeln_safe(&format_md_with_frontmatter(&note, url)),
        OutputFormat::Json => print_json(&note),
    }
}

#[derive(Debug, Serialize)]
struct Detection<'a> {
    url: &'a str,
    content_type: &'a str,
    folder: &'a str,
}

async fn run_detect(settings: &Settings, url: &str) {
    let logger = Logger::default();
    logger.set_debug(settings.debug);

    // Detection still works on URL patterns alone without a usable provider
    let provider = match create_provider(settings, logger.clone()) {
        Ok(provider) => Some(provider),
        Err(e) => {
            eprintln!("Warning: {}; content classification disabled", e);
            None
        }
    };
    let registry =
        ContentTypeRegistry::with_defaults(Arc::new(HttpPageFetcher::new()), provider, logger);

    let handler = registry
        .detect_content_type(url)
        .await
        .unwrap_or_else(|e| fail(&e.redact(&settings.api_key).to_string()));
    print_json(&Detection {
        url,
        content_type: handler.content_type(),
        folder: handler.folder_name(),
    });
}

async fn run_models(settings: &Settings) {
    let provider =
        create_provider(settings, Logger::default()).unwrap_or_else(|e| fail(&e.to_string()));
    for model in provider.available_models().await {
        if model.name == model.id {
            writeln_safe(&model.id);
        } else {
            writeln_safe(&format!("{}\t{}", model.id, model.name));
        }
    }
}

async fn run_check(settings: &Settings) {
    let provider =
        create_provider(settings, Logger::default()).unwrap_or_else(|e| fail(&e.to_string()));
    let endpoint = provider.config().endpoint.clone();
    if provider.validate_connection().await {
        writeln_safe(&format!("{}: connected to {}", provider.name(), endpoint));
    } else {
        fail(&format!("{}: cannot reach {}", provider.name(), endpoint));
    }
}

/// Write the note to `dir/folder/file_name`, creating folders as needed
fn save_note(dir: &Path, note: &ImportedNote) -> io::Result<PathBuf> {
    let path = dir.join(note.path());
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, &note.content)?;
    Ok(path)
}

/// Format note as markdown with YAML frontmatter
fn format_md_with_frontmatter(note: &ImportedNote, url: &str) -> String {
    let mut output = String::new();

    output.push_str("---\n");
    // JSON strings are valid YAML scalars, so titles with colons stay intact
    output.push_str(&format!("title: {}\n", yaml_string(&note.title)));
    output.push_str(&format!("source: {}\n", url));
    output.push_str(&format!("content_type: {}\n", note.content_type));
    output.push_str(&format!("path: {}\n", yaml_string(&note.path())));
    output.push_str("---\n");
    output.push_str(&note.content);

    output
}

fn yaml_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
}

fn print_json<T: Serialize>(value: &T) {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        fail(&format!("Error serializing output: {}", e));
    });
    writeln_safe(&json);
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}
