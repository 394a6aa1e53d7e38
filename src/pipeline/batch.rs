//! Batch coordinator: fixed-size batches, concurrent within a batch, sequential across.

use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::pipeline::step::StepExecutor;
use crate::pipeline::unit::{UnitGenerator, UnitResult};
use crate::planner::PlannedUnit;
use crate::workflow::WorkflowRun;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPolicy {
    pub batch_size: usize,
    /// Keep going when some units of a batch fail, as long as one succeeded.
    pub partial_failure_tolerant: bool,
}

impl BatchPolicy {
    pub fn tolerant(batch_size: usize) -> Self {
        Self {
            batch_size,
            partial_failure_tolerant: true,
        }
    }

    pub fn strict(batch_size: usize) -> Self {
        Self {
            batch_size,
            partial_failure_tolerant: false,
        }
    }
}

/// Receives one update per finished batch. Updates are advisory.
pub trait ProgressSink: Send + Sync {
    fn batch_completed(&self, completed: usize, planned: usize);
}

/// Discards progress updates.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn batch_completed(&self, _completed: usize, _planned: usize) {}
}

pub struct BatchCoordinator<'a> {
    executor: &'a StepExecutor,
    policy: BatchPolicy,
}

impl<'a> BatchCoordinator<'a> {
    pub fn new(executor: &'a StepExecutor, policy: BatchPolicy) -> Self {
        Self { executor, policy }
    }

    /// Run every unit, one checkpointed `batch-{n}` step per batch. Results are ordered by
    /// unit index; units that failed in a tolerated batch are absent.
    pub async fn run_batches<G>(
        &self,
        run: &WorkflowRun,
        units: &[PlannedUnit<G::Payload>],
        generator: &G,
        progress: &dyn ProgressSink,
    ) -> Result<Vec<UnitResult>, PipelineError>
    where
        G: UnitGenerator,
    {
        let batch_size = self.policy.batch_size.max(1);
        let planned = units.len();
        let mut results = Vec::with_capacity(planned);
        let mut processed = 0usize;

        for (n, batch) in units.chunks(batch_size).enumerate() {
            let step_name = format!("batch-{n}");
            let batch_results = run
                .step(&step_name, || self.execute_batch(batch, generator))
                .await?;
            processed += batch.len();
            results.extend(batch_results);
            progress.batch_completed(processed, planned);
        }

        results.sort_by_key(|r| r.index);
        Ok(results)
    }

    async fn execute_batch<G>(
        &self,
        batch: &[PlannedUnit<G::Payload>],
        generator: &G,
    ) -> Result<Vec<UnitResult>, PipelineError>
    where
        G: UnitGenerator,
    {
        let mut futures = FuturesUnordered::new();
        for unit in batch {
            futures.push(async move {
                let outcome = self.executor.ensure_unit_processed(unit, generator).await;
                (unit.index, outcome)
            });
        }

        let mut successes = Vec::with_capacity(batch.len());
        let mut failures: Vec<(usize, PipelineError)> = Vec::new();
        while let Some((index, outcome)) = futures.next().await {
            match outcome {
                Ok(result) => successes.push(result),
                Err(e) => failures.push((index, e)),
            }
        }
        failures.sort_by_key(|(index, _)| *index);

        let first = batch.first().map_or(0, |u| u.index);
        let last = batch.last().map_or(0, |u| u.index);

        if !failures.is_empty() && !self.policy.partial_failure_tolerant {
            let (index, error) = failures.remove(0);
            warn!(index, error = %error, "Unit failed, failing batch");
            return Err(PipelineError::UnitFailed {
                index,
                message: error.to_string(),
                retryable: error.is_retryable(),
            });
        }

        if successes.is_empty() && !failures.is_empty() {
            let reasons: Vec<String> = failures
                .iter()
                .map(|(index, e)| format!("unit {index}: {e}"))
                .collect();
            return Err(PipelineError::BatchFailed {
                message: format!(
                    "All units in batch {first}-{last} failed: {}",
                    reasons.join("; ")
                ),
                retryable: failures.iter().any(|(_, e)| e.is_retryable()),
            });
        }

        for (index, error) in &failures {
            warn!(index, error = %error, "Unit failed, continuing with the rest of the batch");
        }
        info!(
            first,
            last,
            succeeded = successes.len(),
            failed = failures.len(),
            "Batch finished"
        );
        successes.sort_by_key(|r| r.index);
        Ok(successes)
    }
}
