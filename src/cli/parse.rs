//! CLI parse: clap types for lexicast. No behavior; definitions only.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::thumbnail::params::{ImageFormat, Theme};
use crate::tts::params::AudioFormat;

/// Lexicast CLI - durable narration and thumbnail generation
#[derive(Parser)]
#[command(name = "lexicast")]
#[command(about = "Narrate documents and render thumbnails with resumable, cached jobs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (config/ is read from here)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides layered config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Voice options shared by the narration commands
#[derive(Debug, Clone, Args)]
pub struct TtsOptions {
    /// Backend: openai, google, kokoro (apple_say and xtts alias kokoro)
    #[arg(long)]
    pub provider: Option<String>,
    #[arg(long)]
    pub voice: Option<String>,
    #[arg(long, default_value_t = 1.0)]
    pub speed: f32,
    #[arg(long, default_value = "mp3")]
    pub audio_format: AudioFormat,
    /// BCP-47 language code, e.g. en-US
    #[arg(long)]
    pub language: Option<String>,
    #[arg(long)]
    pub sample_rate: Option<u32>,
    #[arg(long)]
    pub title: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Narrate a markdown document
    TtsDocument {
        /// Owning entity id
        #[arg(long)]
        entity: String,
        /// Markdown file
        file: PathBuf,
        #[command(flatten)]
        tts: TtsOptions,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Narrate an article from plain text, optionally with its HTML
    TtsArticle {
        #[arg(long)]
        entity: String,
        /// Plain text file
        text: PathBuf,
        /// HTML file; headings drive section splitting
        #[arg(long)]
        html: Option<PathBuf>,
        #[command(flatten)]
        tts: TtsOptions,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Render light/dark thumbnails of an entity
    Thumbnail {
        #[arg(long)]
        entity: String,
        /// File holding the entity's serialized content
        file: PathBuf,
        /// Themes to render (repeatable)
        #[arg(long = "theme")]
        themes: Vec<Theme>,
        #[arg(long, default_value_t = 640)]
        width: u32,
        #[arg(long, default_value_t = 480)]
        height: u32,
        #[arg(long, default_value = "webp")]
        image_format: ImageFormat,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Show one job
    Status {
        /// Job key
        key: String,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// List known jobs
    Jobs {
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Resume runs interrupted mid-flight
    Resume {
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Re-run queued and failed jobs whose retry time has come
    ProcessDue {
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}
