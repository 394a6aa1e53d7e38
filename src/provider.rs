//! Generation provider abstraction
//!
//! Speech synthesis and page rendering backends behind two traits, plus the shared HTTP
//! plumbing (client construction, status classification) and the tagged provider
//! configuration they are built from.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::thumbnail::params::{ImageFormat, Theme};
use crate::tts::params::{AudioFormat, SpeechProviderKind};

pub mod google;
pub mod kokoro;
pub mod openai;
pub mod render;

pub use google::GoogleSpeech;
pub use kokoro::KokoroSpeech;
pub use openai::OpenAiSpeech;
pub use render::HeadlessRenderer;

/// One synthesis call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeechRequest {
    /// Plain text, or an SSML document when `is_ssml` is set
    pub input: String,
    pub is_ssml: bool,
    pub voice_id: String,
    pub speed: f32,
    pub format: AudioFormat,
    pub language_code: String,
    pub sample_rate_hz: Option<u32>,
}

#[async_trait]
pub trait SpeechProvider: Send + Sync {
    fn kind(&self) -> SpeechProviderKind;

    /// Synthesize audio bytes in the requested format.
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, PipelineError>;
}

/// One screenshot call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderRequest {
    pub url: String,
    pub selector: String,
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f32,
    pub format: ImageFormat,
    pub quality: u8,
    pub theme: Theme,
    pub timeout_ms: u64,
}

#[async_trait]
pub trait RenderProvider: Send + Sync {
    async fn render(&self, request: &RenderRequest) -> Result<Vec<u8>, PipelineError>;
}

/// Provider configuration, one entry per named provider in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    #[serde(rename = "openai")]
    OpenAi {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default = "default_openai_model")]
        model: String,
    },
    Google {
        api_key: String,
        #[serde(default)]
        endpoint: Option<String>,
    },
    Kokoro {
        url: String,
        #[serde(default)]
        bearer_token: Option<String>,
    },
    HeadlessRender { url: String },
}

fn default_openai_model() -> String {
    "tts-1".to_string()
}

impl ProviderConfig {
    pub fn type_name(&self) -> &'static str {
        match self {
            ProviderConfig::OpenAi { .. } => "openai",
            ProviderConfig::Google { .. } => "google",
            ProviderConfig::Kokoro { .. } => "kokoro",
            ProviderConfig::HeadlessRender { .. } => "headless_render",
        }
    }

    /// Problems with this entry, empty when valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        match self {
            ProviderConfig::OpenAi {
                api_key, base_url, ..
            } => {
                if api_key.trim().is_empty() {
                    errors.push("api_key must not be empty".to_string());
                }
                if let Some(url) = base_url {
                    check_url(url, "base_url", &mut errors);
                }
            }
            ProviderConfig::Google { api_key, endpoint } => {
                if api_key.trim().is_empty() {
                    errors.push("api_key must not be empty".to_string());
                }
                if let Some(url) = endpoint {
                    check_url(url, "endpoint", &mut errors);
                }
            }
            ProviderConfig::Kokoro { url, .. } | ProviderConfig::HeadlessRender { url } => {
                check_url(url, "url", &mut errors);
            }
        }
        errors
    }
}

fn check_url(url: &str, field: &str, errors: &mut Vec<String>) {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(format!("{field} must be an http(s) URL, got '{url}'"));
    }
}

/// Resolved provider handles, keyed by backend.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    speech: HashMap<SpeechProviderKind, Arc<dyn SpeechProvider>>,
    renderer: Option<Arc<dyn RenderProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build clients for every configured provider. The last entry of a given type wins.
    pub fn from_config(configs: &HashMap<String, ProviderConfig>) -> Result<Self, PipelineError> {
        let mut names: Vec<&String> = configs.keys().collect();
        names.sort();

        let mut registry = Self::new();
        for name in names {
            let config = &configs[name];
            let errors = config.validate();
            if !errors.is_empty() {
                return Err(PipelineError::ConfigError(format!(
                    "provider '{name}': {}",
                    errors.join("; ")
                )));
            }
            registry = match config {
                ProviderConfig::OpenAi {
                    api_key,
                    base_url,
                    model,
                } => registry.with_speech(Arc::new(OpenAiSpeech::new(
                    api_key.clone(),
                    base_url.clone(),
                    model.clone(),
                )?)),
                ProviderConfig::Google { api_key, endpoint } => registry.with_speech(Arc::new(
                    GoogleSpeech::new(api_key.clone(), endpoint.clone())?,
                )),
                ProviderConfig::Kokoro { url, bearer_token } => registry.with_speech(Arc::new(
                    KokoroSpeech::new(url.clone(), bearer_token.clone())?,
                )),
                ProviderConfig::HeadlessRender { url } => {
                    registry.with_renderer(Arc::new(HeadlessRenderer::new(url.clone())?))
                }
            };
        }
        Ok(registry)
    }

    pub fn with_speech(mut self, provider: Arc<dyn SpeechProvider>) -> Self {
        self.speech.insert(provider.kind(), provider);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn RenderProvider>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn has_speech(&self, kind: SpeechProviderKind) -> bool {
        self.speech.contains_key(&kind)
    }

    pub fn speech(&self, kind: SpeechProviderKind) -> Result<Arc<dyn SpeechProvider>, PipelineError> {
        self.speech.get(&kind).cloned().ok_or_else(|| {
            PipelineError::ProviderNotConfigured(format!("no {kind} speech provider configured"))
        })
    }

    pub fn renderer(&self) -> Result<Arc<dyn RenderProvider>, PipelineError> {
        self.renderer.clone().ok_or_else(|| {
            PipelineError::ProviderNotConfigured("no headless renderer configured".to_string())
        })
    }
}

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PROVIDER_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub(crate) fn build_provider_http_client() -> Result<Client, PipelineError> {
    Client::builder()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT)
        .timeout(PROVIDER_HTTP_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| PipelineError::ConfigError(format!("Failed to create HTTP client: {}", e)))
}

/// Map transport failures onto pipeline errors.
pub(crate) fn map_http_error(error: reqwest::Error) -> PipelineError {
    if let Some(status) = error.status() {
        classify_status(status.as_u16(), error.to_string())
    } else if error.is_timeout() {
        PipelineError::Timeout(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        PipelineError::Network(format!("Connection error: {}", error))
    } else {
        PipelineError::Network(format!("HTTP error: {}", error))
    }
}

/// 4xx is the caller's fault and is not retried, except throttling and request timeouts.
pub fn classify_status(status: u16, message: String) -> PipelineError {
    match status {
        408 | 429 => PipelineError::ProviderUnavailable { status, message },
        400..=499 => PipelineError::ProviderRejected { status, message },
        _ => PipelineError::ProviderUnavailable { status, message },
    }
}

/// Pass successful responses through; turn the rest into classified errors with the body.
pub(crate) async fn ensure_success(
    provider: &str,
    response: Response,
) -> Result<Response, PipelineError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(classify_status(
        status.as_u16(),
        format!("{provider}: {}", body.trim()),
    ))
}
