//! Google Cloud Text-to-Speech (`text:synthesize`, base64 audio in the response).

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PipelineError;
use crate::provider::{
    build_provider_http_client, ensure_success, map_http_error, SpeechProvider, SpeechRequest,
};
use crate::tts::params::{AudioFormat, SpeechProviderKind};

const DEFAULT_ENDPOINT: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

/// Per-request input limit for text or SSML
pub const GOOGLE_MAX_INPUT_CHARS: usize = 5000;

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct SynthesizeBody<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
enum SynthesisInput<'a> {
    Text(&'a str),
    Ssml(&'a str),
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
    speaking_rate: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_rate_hertz: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

pub struct GoogleSpeech {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl GoogleSpeech {
    pub fn new(api_key: String, endpoint: Option<String>) -> Result<Self, PipelineError> {
        Ok(Self {
            client: build_provider_http_client()?,
            api_key,
            endpoint: endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        })
    }
}

fn audio_encoding(format: AudioFormat) -> &'static str {
    match format {
        AudioFormat::Mp3 => "MP3",
        AudioFormat::Ogg => "OGG_OPUS",
        AudioFormat::Wav => "LINEAR16",
    }
}

fn build_body(request: &SpeechRequest) -> SynthesizeBody<'_> {
    let is_ssml = request.is_ssml || request.input.trim_start().starts_with("<speak");
    SynthesizeBody {
        input: if is_ssml {
            SynthesisInput::Ssml(&request.input)
        } else {
            SynthesisInput::Text(&request.input)
        },
        voice: VoiceSelection {
            language_code: &request.language_code,
            name: &request.voice_id,
        },
        audio_config: AudioConfig {
            audio_encoding: audio_encoding(request.format),
            speaking_rate: request.speed,
            sample_rate_hertz: request.sample_rate_hz,
        },
    }
}

#[async_trait]
impl SpeechProvider for GoogleSpeech {
    fn kind(&self) -> SpeechProviderKind {
        SpeechProviderKind::Google
    }

    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, PipelineError> {
        if request.input.chars().count() > GOOGLE_MAX_INPUT_CHARS {
            return Err(PipelineError::ProviderRejected {
                status: 400,
                message: format!("input exceeds {GOOGLE_MAX_INPUT_CHARS} characters"),
            });
        }

        let body = build_body(request);
        debug!(voice = %request.voice_id, ssml = matches!(body.input, SynthesisInput::Ssml(_)), "Google speech request");
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = ensure_success("google", response).await?;
        let parsed: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::ProviderError(format!("Failed to parse response: {}", e)))?;
        STANDARD
            .decode(parsed.audio_content.as_bytes())
            .map_err(|e| PipelineError::ProviderError(format!("Invalid audio payload: {}", e)))
    }
}
