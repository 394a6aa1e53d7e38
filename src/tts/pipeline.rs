//! Narration jobs on the shared pipeline engine.

use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::job::{JobContent, JobParams, JobRequest};
use crate::pipeline::{BatchPolicy, JobPipeline, ManifestMeta};
use crate::planner::html::html_to_text;
use crate::planner::PlannedUnit;
use crate::provider::ProviderRegistry;
use crate::tts::generator::SpeechGenerator;
use crate::tts::params::{ResolvedTts, SpeechProviderKind};
use crate::tts::plan::{estimate_cost, plan_article, plan_document, SpeechChunk};
use crate::tts::TtsConfig;

pub struct TtsPipeline {
    providers: ProviderRegistry,
    config: TtsConfig,
}

impl TtsPipeline {
    pub fn new(providers: ProviderRegistry, config: TtsConfig) -> Self {
        Self { providers, config }
    }

    pub fn config(&self) -> &TtsConfig {
        &self.config
    }

    pub fn resolve(&self, request: &JobRequest) -> Result<ResolvedTts, PipelineError> {
        match &request.params {
            JobParams::Tts(params) => {
                Ok(params.resolve(self.providers.has_speech(SpeechProviderKind::Kokoro)))
            }
            JobParams::Thumbnail(_) => Err(PipelineError::ConfigError(format!(
                "job {} is not a narration job",
                request.key
            ))),
        }
    }

    fn check_budget(
        &self,
        units: &[PlannedUnit<SpeechChunk>],
        provider: SpeechProviderKind,
    ) -> Result<(), PipelineError> {
        let Some(budget) = self.config.max_budget_usd.filter(|b| *b > 0.0) else {
            return Ok(());
        };
        let estimated = estimate_cost(units, self.config.prices.per_million(provider));
        debug!(provider = %provider, estimated, budget, "Estimated narration cost");
        if estimated > budget {
            warn!(provider = %provider, estimated, budget, "Narration over budget");
            return Err(PipelineError::BudgetExceeded { estimated, budget });
        }
        Ok(())
    }
}

impl JobPipeline for TtsPipeline {
    type Generator = SpeechGenerator;

    fn plan(&self, request: &JobRequest) -> Result<Vec<PlannedUnit<SpeechChunk>>, PipelineError> {
        let resolved = self.resolve(request)?;
        let opts = self.config.chunk_options();
        let units = match &request.content {
            JobContent::Markdown { markdown } => plan_document(markdown, opts, &resolved),
            JobContent::Article { plain_text, html } => {
                if plain_text.trim().is_empty() {
                    let text = html.as_deref().map(html_to_text).unwrap_or_default();
                    plan_article(&text, html.as_deref(), opts, &resolved)
                } else {
                    plan_article(plain_text, html.as_deref(), opts, &resolved)
                }
            }
            JobContent::Entity { .. } => {
                return Err(PipelineError::ConfigError(
                    "entity content cannot be narrated".to_string(),
                ))
            }
        };
        if units.is_empty() {
            return Err(PipelineError::EmptyPlan(format!(
                "no speakable text for {}",
                request.entity_id
            )));
        }
        self.check_budget(&units, resolved.provider)?;
        Ok(units)
    }

    fn generator(&self, request: &JobRequest) -> Result<SpeechGenerator, PipelineError> {
        let resolved = self.resolve(request)?;
        let provider = self.providers.speech(resolved.provider)?;
        Ok(SpeechGenerator::new(provider, resolved))
    }

    fn manifest_meta(&self, request: &JobRequest) -> Result<ManifestMeta, PipelineError> {
        let resolved = self.resolve(request)?;
        Ok(ManifestMeta {
            kind: request.kind,
            entity_id: request.entity_id.clone(),
            version: request.version.to_string(),
            provider: resolved.provider.as_str().to_string(),
            voice_id: Some(resolved.voice_id),
            format: resolved.format.extension().to_string(),
            title: request.title.clone(),
        })
    }

    fn batch_policy(&self) -> BatchPolicy {
        BatchPolicy {
            batch_size: self.config.batch_size.max(1),
            partial_failure_tolerant: self.config.partial_failure_tolerant,
        }
    }
}
