//! Checkpointed workflow runs.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::workflow::log::{RunStatus, StepLog};

/// One hosted execution of a workflow.
///
/// Each named step runs at most once per run: its output is appended to the step log, and
/// a later call with the same name (in this process or after a restart) returns the logged
/// output without running the step again. Step names must be unique within a run.
pub struct WorkflowRun {
    log: Arc<dyn StepLog>,
    run_id: String,
    completed: Mutex<HashMap<String, Value>>,
}

impl WorkflowRun {
    pub fn start(log: Arc<dyn StepLog>, run_id: &str, input: &Value) -> Result<Self, PipelineError> {
        log.begin_run(run_id, input)?;
        let completed: HashMap<String, Value> = log
            .steps(run_id)?
            .into_iter()
            .map(|step| (step.name, step.output))
            .collect();
        if !completed.is_empty() {
            debug!(run_id, checkpoints = completed.len(), "Resuming workflow run");
        }
        Ok(Self {
            log,
            run_id: run_id.to_string(),
            completed: Mutex::new(completed),
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Number of steps with a recorded output.
    pub fn checkpoint_count(&self) -> usize {
        self.completed.lock().len()
    }

    pub fn is_checkpointed(&self, name: &str) -> bool {
        self.completed.lock().contains_key(name)
    }

    /// Run `f` as the step `name`, or return its recorded output.
    pub async fn step<T, F, Fut>(&self, name: &str, f: F) -> Result<T, PipelineError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, PipelineError>>,
    {
        let cached = self.completed.lock().get(name).cloned();
        if let Some(value) = cached {
            debug!(run_id = %self.run_id, step = name, "Step replayed from log");
            return Ok(serde_json::from_value(value)?);
        }

        let output = f().await?;
        let value = serde_json::to_value(&output)?;
        self.log.append_step(&self.run_id, name, &value)?;
        self.completed.lock().insert(name.to_string(), value);
        Ok(output)
    }

    pub fn complete(&self) {
        self.finish(RunStatus::Completed, None);
    }

    pub fn fail(&self, message: &str) {
        self.finish(RunStatus::Failed, Some(message));
    }

    pub fn abandon(&self) {
        self.finish(RunStatus::Abandoned, None);
    }

    fn finish(&self, status: RunStatus, error: Option<&str>) {
        if let Err(e) = self.log.finish_run(&self.run_id, status, error) {
            warn!(run_id = %self.run_id, status = status.as_str(), error = %e, "Failed to record run status");
        }
    }
}
