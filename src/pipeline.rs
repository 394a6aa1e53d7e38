//! Generic job pipeline
//!
//! Every job runs the same sequence: validate against the owning entity, plan units, execute
//! them in checkpointed batches, write the manifest, mark the job ready, and record the result
//! on the entity. Pipelines only supply the planning, the unit generator and the manifest
//! metadata.

pub mod batch;
pub mod finalize;
pub mod persist;
pub mod runner;
pub mod step;
pub mod unit;
pub mod validate;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::entity::EntityStore;
use crate::error::PipelineError;
use crate::job::{JobRequest, JobStatusStore};
use crate::planner::PlannedUnit;
use crate::retry::RetryPolicy;
use crate::storage::ObjectStore;
use crate::types::JobKey;
use crate::workflow::{StepLog, WorkflowRun};

pub use batch::{BatchCoordinator, BatchPolicy, NoProgress, ProgressSink};
pub use finalize::{finalize, FinalizeOutcome, Manifest, ManifestMeta, ManifestSegment};
pub use persist::{persist, ManifestSummary};
pub use runner::{JobOutcome, JobRunner};
pub use step::StepExecutor;
pub use unit::{UnitGenerator, UnitPayload, UnitResult};
pub use validate::validate;

/// Handles to the collaborators every step needs.
#[derive(Clone)]
pub struct PipelineContext {
    pub objects: Arc<dyn ObjectStore>,
    pub jobs: Arc<dyn JobStatusStore>,
    pub entities: Arc<dyn EntityStore>,
    pub steps: Arc<dyn StepLog>,
    pub provider_retry: RetryPolicy,
    pub upload_retry: RetryPolicy,
}

impl PipelineContext {
    pub fn executor(&self) -> StepExecutor {
        StepExecutor::with_policies(self.objects.clone(), self.provider_retry, self.upload_retry)
    }
}

/// One kind of job built on the shared engine.
pub trait JobPipeline: Send + Sync {
    type Generator: UnitGenerator;

    /// Split the request's content into ordered units. An empty plan is an error.
    fn plan(
        &self,
        request: &JobRequest,
    ) -> Result<Vec<PlannedUnit<<Self::Generator as UnitGenerator>::Payload>>, PipelineError>;

    fn generator(&self, request: &JobRequest) -> Result<Self::Generator, PipelineError>;

    fn manifest_meta(&self, request: &JobRequest) -> Result<ManifestMeta, PipelineError>;

    fn batch_policy(&self) -> BatchPolicy;
}

/// Progress updates written to the job record.
struct JobProgress<'a> {
    jobs: &'a dyn JobStatusStore,
    key: &'a JobKey,
}

impl ProgressSink for JobProgress<'_> {
    fn batch_completed(&self, completed: usize, planned: usize) {
        debug!(job_key = %self.key, completed, planned, "Batch progress");
        if let Err(e) = self.jobs.update_progress(self.key, completed) {
            warn!(job_key = %self.key, error = %e, "Failed to record progress");
        }
    }
}

/// Run a request through `pipeline` inside `run`.
pub async fn execute<P>(
    ctx: &PipelineContext,
    pipeline: &P,
    run: &WorkflowRun,
    request: &JobRequest,
) -> Result<FinalizeOutcome, PipelineError>
where
    P: JobPipeline,
{
    validate(ctx.entities.as_ref(), ctx.jobs.as_ref(), request)?;

    let units = run.step("plan", || async { pipeline.plan(request) }).await?;
    if units.is_empty() {
        return Err(PipelineError::EmptyPlan(format!(
            "no units planned for {}",
            request.entity_id
        )));
    }
    ctx.jobs.mark_processing(&request.key, units.len())?;
    info!(job_key = %request.key, kind = %request.kind, units = units.len(), "Planned job");

    let generator = pipeline.generator(request)?;
    let executor = ctx.executor();
    let progress = JobProgress {
        jobs: ctx.jobs.as_ref(),
        key: &request.key,
    };
    let results = BatchCoordinator::new(&executor, pipeline.batch_policy())
        .run_batches(run, &units, &generator, &progress)
        .await?;

    // content may have changed while units were generating
    validate(ctx.entities.as_ref(), ctx.jobs.as_ref(), request)?;

    let meta = pipeline.manifest_meta(request)?;
    let outcome: FinalizeOutcome = run
        .step("finalize", || {
            finalize(
                ctx.objects.as_ref(),
                &ctx.upload_retry,
                &request.key,
                &meta,
                results,
            )
        })
        .await?;

    ctx.jobs.mark_ready(
        &request.key,
        &outcome.manifest_ref,
        outcome.stitched_ref.as_deref(),
        outcome.unit_count,
    )?;

    let summary = ManifestSummary::ready(&request.key, request.version.as_str(), &meta.provider, &outcome);
    run.step("persist", || async {
        persist(
            ctx.entities.as_ref(),
            &request.entity_id,
            request.kind.entity_slot(),
            &summary,
        )
    })
    .await?;

    info!(
        job_key = %request.key,
        manifest_ref = %outcome.manifest_ref,
        unit_count = outcome.unit_count,
        total_chars = outcome.total_chars,
        "Job ready"
    );
    Ok(outcome)
}
