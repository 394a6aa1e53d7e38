//! CLI route: single route table and run context. Dispatches to the facade and presentation.

use std::path::Path;

use tokio::runtime::Runtime;

use crate::api::Lexicast;
use crate::cli::parse::{Commands, OutputFormat, TtsOptions};
use crate::cli::presentation::{format_job_status, format_job_table, format_outcome, format_runs};
use crate::config::{ConfigLoader, LexicastConfig};
use crate::error::PipelineError;
use crate::job::{JobContent, JobParams, JobRequest};
use crate::thumbnail::params::ThumbnailParams;
use crate::tts::params::TtsParams;
use crate::types::{now_millis, JobKey};

/// Runtime context for CLI execution: loaded config, the facade and a tokio runtime.
pub struct RunContext {
    lexicast: Lexicast,
    runtime: Runtime,
}

impl RunContext {
    /// Load configuration from `config_path`, or the layered sources under `workspace_root`.
    pub fn load_config(
        workspace_root: &Path,
        config_path: Option<&Path>,
    ) -> Result<LexicastConfig, PipelineError> {
        Ok(match config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(workspace_root)?,
        })
    }

    pub fn new(config: &LexicastConfig) -> Result<Self, PipelineError> {
        let runtime = Runtime::new()
            .map_err(|e| PipelineError::ConfigError(format!("Failed to start runtime: {}", e)))?;
        // the provider HTTP clients are built inside the runtime
        let lexicast = runtime.block_on(async { Lexicast::open(config) })?;
        Ok(Self { lexicast, runtime })
    }

    pub fn execute(&self, command: &Commands) -> Result<String, PipelineError> {
        match command {
            Commands::TtsDocument {
                entity,
                file,
                tts,
                format,
            } => {
                let content = JobContent::Markdown {
                    markdown: read_file(file)?,
                };
                self.run_once(entity, content, tts_params(tts), tts.title.clone(), *format)
            }
            Commands::TtsArticle {
                entity,
                text,
                html,
                tts,
                format,
            } => {
                let html = html.as_deref().map(read_file).transpose()?;
                let content = JobContent::Article {
                    plain_text: read_file(text)?,
                    html,
                };
                self.run_once(entity, content, tts_params(tts), tts.title.clone(), *format)
            }
            Commands::Thumbnail {
                entity,
                file,
                themes,
                width,
                height,
                image_format,
                format,
            } => {
                let defaults = ThumbnailParams::default();
                let params = ThumbnailParams {
                    themes: if themes.is_empty() {
                        defaults.themes.clone()
                    } else {
                        themes.clone()
                    },
                    width: *width,
                    height: *height,
                    format: *image_format,
                    ..defaults
                };
                let content = JobContent::Entity {
                    content: read_file(file)?,
                };
                self.run_once(entity, content, JobParams::Thumbnail(params), None, *format)
            }
            Commands::Status { key, format } => {
                match self.lexicast.get_job_status(&JobKey::new(key.as_str()))? {
                    Some(view) => format_job_status(&view, *format),
                    None => Err(PipelineError::StorageError(
                        crate::error::StorageError::ObjectNotFound(format!("job {key}")),
                    )),
                }
            }
            Commands::Jobs { format } => format_job_table(&self.lexicast.list_jobs()?, *format),
            Commands::Resume { format } => {
                let runs = self.runtime.block_on(self.lexicast.resume_pending())?;
                format_runs("Resumed", &runs, *format)
            }
            Commands::ProcessDue { limit, format } => {
                let runs = self
                    .runtime
                    .block_on(self.lexicast.process_due_jobs(now_millis(), *limit))?;
                format_runs("Processed", &runs, *format)
            }
        }
    }

    fn run_once(
        &self,
        entity: &str,
        content: JobContent,
        params: JobParams,
        title: Option<String>,
        format: OutputFormat,
    ) -> Result<String, PipelineError> {
        let request: JobRequest = self
            .lexicast
            .prepare_request(entity, content, params, title)?;
        let outcome = self.runtime.block_on(self.lexicast.run_job(&request))?;
        format_outcome(&request.key, &outcome, format)
    }
}

fn tts_params(options: &TtsOptions) -> JobParams {
    JobParams::Tts(TtsParams {
        provider: options.provider.clone(),
        voice_id: options.voice.clone(),
        speed: options.speed,
        format: options.audio_format,
        language_code: options.language.clone(),
        sample_rate_hz: options.sample_rate,
    })
}

fn read_file(path: &Path) -> Result<String, PipelineError> {
    std::fs::read_to_string(path).map_err(|e| {
        PipelineError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
    })
}
