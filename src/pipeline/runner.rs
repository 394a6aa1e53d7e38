//! Job boundary: hosts a workflow run per request and turns its result into a job status.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::PipelineError;
use crate::job::{JobRequest, JobStatus};
use crate::pipeline::{execute, FinalizeOutcome, PipelineContext};
use crate::thumbnail::ThumbnailPipeline;
use crate::tts::TtsPipeline;
use crate::types::JobKind;
use crate::workflow::{JobHandler, RunStatus, WorkflowRun};

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    Ready(FinalizeOutcome),
    /// The output already existed; nothing was generated.
    Duplicate { manifest_ref: Option<String> },
    Stale { reason: String },
    Failed { message: String, retryable: bool },
}

impl JobOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, JobOutcome::Ready(_) | JobOutcome::Duplicate { .. })
    }
}

pub struct JobRunner {
    ctx: PipelineContext,
    tts: TtsPipeline,
    thumbnail: ThumbnailPipeline,
}

impl JobRunner {
    pub fn new(ctx: PipelineContext, tts: TtsPipeline, thumbnail: ThumbnailPipeline) -> Self {
        Self {
            ctx,
            tts,
            thumbnail,
        }
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Run one request to a terminal job status.
    ///
    /// Pipeline failures are recorded on the job and reported in the outcome; `Err` is only
    /// returned when the job itself cannot be read or written.
    pub async fn run(&self, request: &JobRequest) -> Result<JobOutcome, PipelineError> {
        let record = self.ctx.jobs.upsert_queued(request)?;
        if record.status == JobStatus::Ready {
            info!(job_key = %request.key, "Job already ready");
            if let Some(open) = self.ctx.steps.get_run(request.key.as_str())? {
                if open.status == RunStatus::Running {
                    self.ctx
                        .steps
                        .finish_run(request.key.as_str(), RunStatus::Completed, None)?;
                }
            }
            return Ok(JobOutcome::Duplicate {
                manifest_ref: record.manifest_ref,
            });
        }

        let input = serde_json::to_value(request)?;
        let run = WorkflowRun::start(self.ctx.steps.clone(), request.key.as_str(), &input)?;

        let result = match request.kind {
            JobKind::DocumentTts | JobKind::ArticleTts => {
                execute(&self.ctx, &self.tts, &run, request).await
            }
            JobKind::Thumbnail => execute(&self.ctx, &self.thumbnail, &run, request).await,
        };

        match result {
            Ok(outcome) => {
                run.complete();
                Ok(JobOutcome::Ready(outcome))
            }
            Err(e) => self.settle_failure(&run, request, e),
        }
    }

    fn settle_failure(
        &self,
        run: &WorkflowRun,
        request: &JobRequest,
        err: PipelineError,
    ) -> Result<JobOutcome, PipelineError> {
        let key = &request.key;
        match err {
            PipelineError::DuplicateReady {
                manifest_ref,
                stitched_ref,
                unit_count,
            } => {
                match manifest_ref.as_deref() {
                    Some(manifest) => {
                        self.ctx
                            .jobs
                            .mark_ready(key, manifest, stitched_ref.as_deref(), unit_count)?;
                    }
                    None => {
                        self.ctx.jobs.mark_stale(key)?;
                    }
                }
                run.complete();
                Ok(JobOutcome::Duplicate { manifest_ref })
            }
            e if e.is_stale() => {
                warn!(job_key = %key, reason = %e, "Job abandoned as stale");
                run.abandon();
                Ok(JobOutcome::Stale {
                    reason: e.to_string(),
                })
            }
            e => {
                let message = e.to_string();
                let retryable = e.is_reschedulable();
                error!(job_key = %key, retryable, error = %message, "Job failed");
                if retryable {
                    self.ctx.jobs.mark_error(key, &message)?;
                } else {
                    self.ctx.jobs.mark_failed(key, &message)?;
                }
                run.fail(&message);
                Ok(JobOutcome::Failed { message, retryable })
            }
        }
    }
}

#[async_trait]
impl JobHandler for JobRunner {
    async fn handle(&self, request: JobRequest) -> Result<(), PipelineError> {
        self.run(&request).await.map(|_| ())
    }
}
