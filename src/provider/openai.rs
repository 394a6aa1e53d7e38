//! OpenAI speech synthesis (`POST {base}/audio/speech`).

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::error::PipelineError;
use crate::provider::{
    build_provider_http_client, ensure_success, map_http_error, SpeechProvider, SpeechRequest,
};
use crate::tts::params::{AudioFormat, SpeechProviderKind};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Serialize)]
struct SpeechBody<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
    speed: f32,
}

pub struct OpenAiSpeech {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiSpeech {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        model: String,
    ) -> Result<Self, PipelineError> {
        let client = build_provider_http_client()?;
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            client,
            api_key,
            base_url,
            model,
        })
    }
}

pub(crate) fn response_format(format: AudioFormat) -> &'static str {
    match format {
        AudioFormat::Mp3 => "mp3",
        AudioFormat::Ogg => "opus",
        AudioFormat::Wav => "wav",
    }
}

#[async_trait]
impl SpeechProvider for OpenAiSpeech {
    fn kind(&self) -> SpeechProviderKind {
        SpeechProviderKind::OpenAi
    }

    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, PipelineError> {
        let body = SpeechBody {
            model: &self.model,
            input: &request.input,
            voice: &request.voice_id,
            response_format: response_format(request.format),
            // accepted range is 0.25..=4.0
            speed: request.speed.clamp(0.25, 4.0),
        };

        let url = format!("{}/audio/speech", self.base_url);
        debug!(voice = %request.voice_id, chars = request.input.len(), "OpenAI speech request");
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = ensure_success("openai", response).await?;
        let bytes = response.bytes().await.map_err(map_http_error)?;
        if bytes.is_empty() {
            return Err(PipelineError::ProviderError(
                "openai returned empty audio".to_string(),
            ));
        }
        Ok(bytes.to_vec())
    }
}
