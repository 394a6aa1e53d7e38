//! Kokoro sidecar (`POST {url}/v1/audio/speech`), OpenAI-compatible request body.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::PipelineError;
use crate::provider::openai::response_format;
use crate::provider::{
    build_provider_http_client, ensure_success, map_http_error, SpeechProvider, SpeechRequest,
};
use crate::tts::params::SpeechProviderKind;

#[derive(Serialize)]
struct SpeechBody<'a> {
    model: &'static str,
    input: &'a str,
    voice: &'a str,
    response_format: &'static str,
    speed: f32,
}

pub struct KokoroSpeech {
    client: Client,
    url: String,
    bearer_token: Option<String>,
}

impl KokoroSpeech {
    pub fn new(url: String, bearer_token: Option<String>) -> Result<Self, PipelineError> {
        Ok(Self {
            client: build_provider_http_client()?,
            url: url.trim_end_matches('/').to_string(),
            bearer_token,
        })
    }
}

#[async_trait]
impl SpeechProvider for KokoroSpeech {
    fn kind(&self) -> SpeechProviderKind {
        SpeechProviderKind::Kokoro
    }

    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, PipelineError> {
        let body = SpeechBody {
            model: "kokoro",
            input: &request.input,
            voice: &request.voice_id,
            response_format: response_format(request.format),
            speed: request.speed,
        };
        let mut builder = self
            .client
            .post(format!("{}/v1/audio/speech", self.url))
            .json(&body);
        if let Some(token) = &self.bearer_token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let response = builder.send().await.map_err(map_http_error)?;
        let response = ensure_success("kokoro", response).await?;
        let bytes = response.bytes().await.map_err(map_http_error)?;
        Ok(bytes.to_vec())
    }
}
