//! Speech synthesis for planned chunks.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::pipeline::UnitGenerator;
use crate::planner::markdown::strip_heading_markers;
use crate::planner::PlannedUnit;
use crate::provider::{SpeechProvider, SpeechRequest};
use crate::tts::params::ResolvedTts;
use crate::tts::plan::SpeechChunk;
use crate::tts::ssml::build_ssml;

pub struct SpeechGenerator {
    provider: Arc<dyn SpeechProvider>,
    resolved: ResolvedTts,
}

impl SpeechGenerator {
    pub fn new(provider: Arc<dyn SpeechProvider>, resolved: ResolvedTts) -> Self {
        Self { provider, resolved }
    }

    pub fn resolved(&self) -> &ResolvedTts {
        &self.resolved
    }

    /// Provider input for a chunk: SSML where the backend understands it, plain text with
    /// heading markers removed otherwise.
    pub fn speech_request(&self, chunk: &SpeechChunk) -> SpeechRequest {
        let is_ssml = self.provider.kind().supports_ssml();
        let input = if is_ssml {
            build_ssml(&chunk.text)
        } else {
            strip_heading_markers(&chunk.text)
        };
        SpeechRequest {
            input,
            is_ssml,
            voice_id: self.resolved.voice_id.clone(),
            speed: self.resolved.speed,
            format: self.resolved.format,
            language_code: self.resolved.language_code.clone(),
            sample_rate_hz: self.resolved.sample_rate_hz,
        }
    }
}

#[async_trait]
impl UnitGenerator for SpeechGenerator {
    type Payload = SpeechChunk;

    fn storage_key(&self, unit: &PlannedUnit<SpeechChunk>) -> String {
        format!(
            "tts/chunks/{}.{}",
            unit.content_hash,
            self.resolved.format.extension()
        )
    }

    fn content_type(&self) -> &'static str {
        self.resolved.format.content_type()
    }

    async fn generate(&self, unit: &PlannedUnit<SpeechChunk>) -> Result<Vec<u8>, PipelineError> {
        let request = self.speech_request(&unit.payload);
        let audio = self.provider.synthesize(&request).await?;
        if audio.is_empty() {
            return Err(PipelineError::ProviderError(format!(
                "{} returned no audio for chunk {}",
                self.provider.kind(),
                unit.index
            )));
        }
        Ok(audio)
    }
}
