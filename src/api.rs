//! Lexicast API
//!
//! Entry point that owns the stores, providers, the job runner and the job queue. Callers
//! submit content and parameters and poll job status; workers and tests run jobs directly.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::{describe_errors, LexicastConfig};
use crate::entity::{EntityStore, SledEntityStore};
use crate::error::PipelineError;
use crate::job::schedule::due_jobs;
use crate::job::{JobContent, JobParams, JobRequest, JobStatus, JobStatusView, SledJobStore};
use crate::pipeline::{JobOutcome, JobRunner, PipelineContext};
use crate::provider::ProviderRegistry;
use crate::thumbnail::{run_thumbnail_batch, ThumbnailBatchSummary, ThumbnailPipeline};
use crate::tts::TtsPipeline;
use crate::types::JobKey;
use crate::workflow::{JobQueue, QueueStats, RunStatus, SledStepLog};

/// A job re-run by a recovery or scheduling pass.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRun {
    pub key: JobKey,
    pub outcome: JobOutcome,
}

pub struct Lexicast {
    runner: Arc<JobRunner>,
    queue: JobQueue,
}

impl Lexicast {
    /// Validate `config`, open the sled database and object store, and build providers.
    pub fn open(config: &LexicastConfig) -> Result<Self, PipelineError> {
        config
            .validate()
            .map_err(|errors| PipelineError::ConfigError(describe_errors(&errors)))?;

        let db = sled::open(&config.storage.data_dir).map_err(|e| {
            PipelineError::ConfigError(format!(
                "Failed to open database at {:?}: {}",
                config.storage.data_dir, e
            ))
        })?;
        let ctx = PipelineContext {
            objects: config.storage.objects.build()?,
            jobs: SledJobStore::shared(&db)?,
            entities: SledEntityStore::shared(&db)?,
            steps: SledStepLog::shared(&db)?,
            provider_retry: config.retry.provider,
            upload_retry: config.retry.upload,
        };
        let providers = ProviderRegistry::from_config(&config.providers)?;
        info!(
            data_dir = %config.storage.data_dir.display(),
            providers = config.providers.len(),
            "Opened lexicast"
        );
        Ok(Self::with_context(ctx, providers, config))
    }

    /// Assemble from existing handles.
    pub fn with_context(
        ctx: PipelineContext,
        providers: ProviderRegistry,
        config: &LexicastConfig,
    ) -> Self {
        let runner = Arc::new(JobRunner::new(
            ctx,
            TtsPipeline::new(providers.clone(), config.tts.clone()),
            ThumbnailPipeline::new(providers, config.thumbnail.clone()),
        ));
        let queue = JobQueue::new(runner.clone(), config.queue);
        Self { runner, queue }
    }

    pub fn context(&self) -> &PipelineContext {
        self.runner.context()
    }

    /// Build a request and record its content as the entity's current content.
    pub fn prepare_request(
        &self,
        entity_id: &str,
        content: JobContent,
        params: JobParams,
        title: Option<String>,
    ) -> Result<JobRequest, PipelineError> {
        let request = JobRequest::new(entity_id, content, params, title)?;
        self.context()
            .entities
            .put_content(&request.entity_id, request.content.entity_content())?;
        Ok(request)
    }

    /// Record the entity's content, persist the request and hand it to the job queue.
    ///
    /// Returns the job key immediately. A job whose output is already ready is not queued.
    pub fn start_job(
        &self,
        entity_id: &str,
        content: JobContent,
        params: JobParams,
        title: Option<String>,
    ) -> Result<JobKey, PipelineError> {
        let request = self.prepare_request(entity_id, content, params, title)?;
        let ctx = self.context();

        let record = ctx.jobs.upsert_queued(&request)?;
        if record.status == JobStatus::Ready {
            info!(job_key = %request.key, "Output already ready, not queueing");
            return Ok(request.key);
        }
        // the run record keeps the request so an interrupted job can be resumed
        ctx.steps
            .begin_run(request.key.as_str(), &serde_json::to_value(&request)?)?;

        let key = request.key.clone();
        self.queue.start();
        self.queue.enqueue(request)?;
        Ok(key)
    }

    /// Run a request to completion on the calling task.
    pub async fn run_job(&self, request: &JobRequest) -> Result<JobOutcome, PipelineError> {
        self.runner.run(request).await
    }

    pub fn get_job_status(&self, key: &JobKey) -> Result<Option<JobStatusView>, PipelineError> {
        Ok(self
            .context()
            .jobs
            .get(key)?
            .map(|record| JobStatusView::from(&record)))
    }

    /// Every known job, most recently updated first.
    pub fn list_jobs(&self) -> Result<Vec<JobStatusView>, PipelineError> {
        let mut views: Vec<JobStatusView> = self
            .context()
            .jobs
            .list()?
            .iter()
            .map(JobStatusView::from)
            .collect();
        views.sort_by(|a, b| b.updated_at_ms.cmp(&a.updated_at_ms));
        Ok(views)
    }

    /// Re-host runs that were interrupted while running. Completed steps are replayed from
    /// their checkpoints.
    pub async fn resume_pending(&self) -> Result<Vec<JobRun>, PipelineError> {
        let runs = self.context().steps.incomplete_runs()?;
        let mut resumed = Vec::new();
        for run in runs.into_iter().filter(|r| r.status == RunStatus::Running) {
            let request: JobRequest = match serde_json::from_value(run.input.clone()) {
                Ok(request) => request,
                Err(e) => {
                    warn!(run_id = %run.run_id, error = %e, "Unreadable run input, abandoning run");
                    self.context().steps.finish_run(
                        &run.run_id,
                        RunStatus::Abandoned,
                        Some("unreadable run input"),
                    )?;
                    continue;
                }
            };
            info!(job_key = %request.key, checkpoints = run.next_seq, "Resuming run");
            let outcome = self.runner.run(&request).await?;
            resumed.push(JobRun {
                key: request.key,
                outcome,
            });
        }
        Ok(resumed)
    }

    /// Re-run up to `limit` queued or failed jobs whose retry time has come.
    pub async fn process_due_jobs(
        &self,
        now_ms: u64,
        limit: usize,
    ) -> Result<Vec<JobRun>, PipelineError> {
        let ctx = self.context();
        let due = due_jobs(ctx.jobs.list()?, now_ms, limit);
        let mut processed = Vec::with_capacity(due.len());
        for record in due {
            let Some(run) = ctx.steps.get_run(record.key.as_str())? else {
                warn!(job_key = %record.key, "No stored request for due job");
                ctx.jobs
                    .mark_failed(&record.key, "request is no longer available")?;
                continue;
            };
            let request: JobRequest = serde_json::from_value(run.input)?;
            info!(job_key = %request.key, attempts = record.attempts, "Running due job");
            let outcome = self.runner.run(&request).await?;
            processed.push(JobRun {
                key: request.key,
                outcome,
            });
        }
        Ok(processed)
    }

    /// Render several thumbnail jobs one after another.
    pub async fn process_thumbnail_batch(&self, requests: &[JobRequest]) -> ThumbnailBatchSummary {
        run_thumbnail_batch(&self.runner, requests).await
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Wait for queued jobs to finish.
    pub async fn wait_for_idle(&self, timeout: Option<Duration>) -> Result<(), PipelineError> {
        self.queue.wait_for_idle(timeout).await
    }

    pub async fn shutdown(&self) {
        self.queue.shutdown().await;
    }
}
