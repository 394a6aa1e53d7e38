//! Thumbnail jobs on the shared pipeline engine.

use crate::error::PipelineError;
use crate::job::{JobParams, JobRequest};
use crate::pipeline::{BatchPolicy, JobPipeline, ManifestMeta};
use crate::planner::PlannedUnit;
use crate::provider::ProviderRegistry;
use crate::thumbnail::generator::{page_url, RenderGenerator};
use crate::thumbnail::params::ThumbnailParams;
use crate::thumbnail::plan::{plan_variants, RenderVariant};
use crate::thumbnail::ThumbnailConfig;

pub const RENDER_PROVIDER_NAME: &str = "headless_render";

pub struct ThumbnailPipeline {
    providers: ProviderRegistry,
    config: ThumbnailConfig,
}

impl ThumbnailPipeline {
    pub fn new(providers: ProviderRegistry, config: ThumbnailConfig) -> Self {
        Self { providers, config }
    }

    fn params<'a>(&self, request: &'a JobRequest) -> Result<&'a ThumbnailParams, PipelineError> {
        match &request.params {
            JobParams::Thumbnail(params) => Ok(params),
            JobParams::Tts(_) => Err(PipelineError::ConfigError(format!(
                "job {} is not a thumbnail job",
                request.key
            ))),
        }
    }
}

impl JobPipeline for ThumbnailPipeline {
    type Generator = RenderGenerator;

    fn plan(&self, request: &JobRequest) -> Result<Vec<PlannedUnit<RenderVariant>>, PipelineError> {
        let units = plan_variants(request.version.as_str(), self.params(request)?);
        if units.is_empty() {
            return Err(PipelineError::EmptyPlan(format!(
                "no themes requested for {}",
                request.entity_id
            )));
        }
        Ok(units)
    }

    fn generator(&self, request: &JobRequest) -> Result<RenderGenerator, PipelineError> {
        let params = self.params(request)?;
        let url = page_url(
            &self.config.app_base_url,
            &request.entity_id,
            params.width,
            params.height,
        )?;
        Ok(RenderGenerator::new(
            self.providers.renderer()?,
            &self.config,
            url,
            params.format,
        ))
    }

    fn manifest_meta(&self, request: &JobRequest) -> Result<ManifestMeta, PipelineError> {
        let params = self.params(request)?;
        Ok(ManifestMeta {
            kind: request.kind,
            entity_id: request.entity_id.clone(),
            version: request.version.to_string(),
            provider: RENDER_PROVIDER_NAME.to_string(),
            voice_id: None,
            format: params.format.extension().to_string(),
            title: request.title.clone(),
        })
    }

    /// Every theme renders at once.
    fn batch_policy(&self) -> BatchPolicy {
        BatchPolicy {
            batch_size: 8,
            partial_failure_tolerant: self.config.partial_failure_tolerant,
        }
    }
}
