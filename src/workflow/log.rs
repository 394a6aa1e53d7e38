//! Durable append-only step log.
//!
//! A run is identified by its job key. Each completed step appends one record holding the
//! step's serialized output; replaying a run reads those records back instead of redoing
//! the work.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sled::{Db, Tree};
use tracing::debug;

use crate::error::StorageError;
use crate::job::store::{to_storage_data, to_storage_io};
use crate::types::now_millis;

const TREE_RUNS: &str = "workflow_runs";
const TREE_STEPS: &str = "workflow_steps";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    /// Ended by staleness; its checkpoints describe content that no longer exists.
    Abandoned,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Abandoned => "abandoned",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    /// The request that started the run, so an interrupted run can be re-hosted.
    pub input: Value,
    pub status: RunStatus,
    pub next_seq: u64,
    pub error: Option<String>,
    pub started_at_ms: u64,
    pub updated_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub run_id: String,
    pub seq: u64,
    pub name: String,
    pub output: Value,
    pub recorded_at_ms: u64,
}

pub trait StepLog: Send + Sync {
    fn put_run(&self, record: &RunRecord) -> Result<(), StorageError>;

    fn get_run(&self, run_id: &str) -> Result<Option<RunRecord>, StorageError>;

    fn list_runs(&self) -> Result<Vec<RunRecord>, StorageError>;

    fn put_step(&self, record: &StepRecord) -> Result<(), StorageError>;

    /// Steps of a run in append order.
    fn steps(&self, run_id: &str) -> Result<Vec<StepRecord>, StorageError>;

    fn clear_steps(&self, run_id: &str) -> Result<(), StorageError>;

    /// Open a run, or re-open an existing one.
    ///
    /// Running and failed runs keep their checkpoints and continue where they stopped.
    /// Completed and abandoned runs start over with an empty log.
    fn begin_run(&self, run_id: &str, input: &Value) -> Result<RunRecord, StorageError> {
        let now = now_millis();
        let record = match self.get_run(run_id)? {
            Some(mut existing) => match existing.status {
                RunStatus::Running => return Ok(existing),
                RunStatus::Failed => {
                    existing.status = RunStatus::Running;
                    existing.error = None;
                    existing.input = input.clone();
                    existing.updated_at_ms = now;
                    existing
                }
                RunStatus::Completed | RunStatus::Abandoned => {
                    self.clear_steps(run_id)?;
                    debug!(run_id, previous = existing.status.as_str(), "Restarting run");
                    new_run(run_id, input, now)
                }
            },
            None => new_run(run_id, input, now),
        };
        self.put_run(&record)?;
        Ok(record)
    }

    /// Append one step output and advance the run's sequence counter.
    fn append_step(
        &self,
        run_id: &str,
        name: &str,
        output: &Value,
    ) -> Result<StepRecord, StorageError> {
        let mut run = self
            .get_run(run_id)?
            .ok_or_else(|| StorageError::ObjectNotFound(format!("workflow run {run_id}")))?;
        let now = now_millis();
        let step = StepRecord {
            run_id: run_id.to_string(),
            seq: run.next_seq,
            name: name.to_string(),
            output: output.clone(),
            recorded_at_ms: now,
        };
        self.put_step(&step)?;
        run.next_seq += 1;
        run.updated_at_ms = now;
        self.put_run(&run)?;
        Ok(step)
    }

    fn finish_run(
        &self,
        run_id: &str,
        status: RunStatus,
        error: Option<&str>,
    ) -> Result<Option<RunRecord>, StorageError> {
        let Some(mut run) = self.get_run(run_id)? else {
            return Ok(None);
        };
        run.status = status;
        run.error = error.map(str::to_string);
        run.updated_at_ms = now_millis();
        self.put_run(&run)?;
        Ok(Some(run))
    }

    /// Runs that were interrupted mid-flight or failed, oldest first.
    fn incomplete_runs(&self) -> Result<Vec<RunRecord>, StorageError> {
        let mut runs: Vec<RunRecord> = self
            .list_runs()?
            .into_iter()
            .filter(|r| matches!(r.status, RunStatus::Running | RunStatus::Failed))
            .collect();
        runs.sort_by_key(|r| r.started_at_ms);
        Ok(runs)
    }
}

fn new_run(run_id: &str, input: &Value, now: u64) -> RunRecord {
    RunRecord {
        run_id: run_id.to_string(),
        input: input.clone(),
        status: RunStatus::Running,
        next_seq: 0,
        error: None,
        started_at_ms: now,
        updated_at_ms: now,
    }
}

fn encode_step_key(run_id: &str, seq: u64) -> String {
    format!("{run_id}:{seq:020}")
}

#[derive(Clone)]
pub struct SledStepLog {
    runs: Tree,
    steps: Tree,
}

impl SledStepLog {
    pub fn new(db: &Db) -> Result<Self, StorageError> {
        let runs = db.open_tree(TREE_RUNS).map_err(to_storage_io)?;
        let steps = db.open_tree(TREE_STEPS).map_err(to_storage_io)?;
        Ok(Self { runs, steps })
    }

    pub fn shared(db: &Db) -> Result<Arc<Self>, StorageError> {
        Ok(Arc::new(Self::new(db)?))
    }
}

impl StepLog for SledStepLog {
    fn put_run(&self, record: &RunRecord) -> Result<(), StorageError> {
        let value = serde_json::to_vec(record).map_err(to_storage_data)?;
        self.runs
            .insert(record.run_id.as_bytes(), value)
            .map_err(to_storage_io)?;
        Ok(())
    }

    fn get_run(&self, run_id: &str) -> Result<Option<RunRecord>, StorageError> {
        let Some(raw) = self.runs.get(run_id.as_bytes()).map_err(to_storage_io)? else {
            return Ok(None);
        };
        let parsed = serde_json::from_slice(&raw).map_err(to_storage_data)?;
        Ok(Some(parsed))
    }

    fn list_runs(&self) -> Result<Vec<RunRecord>, StorageError> {
        let mut out = Vec::new();
        for result in self.runs.iter() {
            let (_, value) = result.map_err(to_storage_io)?;
            out.push(serde_json::from_slice(&value).map_err(to_storage_data)?);
        }
        Ok(out)
    }

    fn put_step(&self, record: &StepRecord) -> Result<(), StorageError> {
        let key = encode_step_key(&record.run_id, record.seq);
        let value = serde_json::to_vec(record).map_err(to_storage_data)?;
        self.steps
            .insert(key.as_bytes(), value)
            .map_err(to_storage_io)?;
        Ok(())
    }

    fn steps(&self, run_id: &str) -> Result<Vec<StepRecord>, StorageError> {
        let prefix = format!("{run_id}:");
        let mut out = Vec::new();
        for result in self.steps.scan_prefix(prefix.as_bytes()) {
            let (_, value) = result.map_err(to_storage_io)?;
            let parsed: StepRecord = serde_json::from_slice(&value).map_err(to_storage_data)?;
            out.push(parsed);
        }
        out.sort_by_key(|s| s.seq);
        Ok(out)
    }

    fn clear_steps(&self, run_id: &str) -> Result<(), StorageError> {
        let prefix = format!("{run_id}:");
        let keys: Vec<Vec<u8>> = self
            .steps
            .scan_prefix(prefix.as_bytes())
            .filter_map(|r| r.ok().map(|(k, _)| k.to_vec()))
            .collect();
        for key in keys {
            self.steps.remove(key).map_err(to_storage_io)?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStepLog {
    runs: RwLock<HashMap<String, RunRecord>>,
    steps: RwLock<HashMap<String, Vec<StepRecord>>>,
}

impl MemoryStepLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StepLog for MemoryStepLog {
    fn put_run(&self, record: &RunRecord) -> Result<(), StorageError> {
        self.runs
            .write()
            .insert(record.run_id.clone(), record.clone());
        Ok(())
    }

    fn get_run(&self, run_id: &str) -> Result<Option<RunRecord>, StorageError> {
        Ok(self.runs.read().get(run_id).cloned())
    }

    fn list_runs(&self) -> Result<Vec<RunRecord>, StorageError> {
        Ok(self.runs.read().values().cloned().collect())
    }

    fn put_step(&self, record: &StepRecord) -> Result<(), StorageError> {
        let mut steps = self.steps.write();
        let entries = steps.entry(record.run_id.clone()).or_default();
        entries.retain(|s| s.seq != record.seq);
        entries.push(record.clone());
        entries.sort_by_key(|s| s.seq);
        Ok(())
    }

    fn steps(&self, run_id: &str) -> Result<Vec<StepRecord>, StorageError> {
        Ok(self.steps.read().get(run_id).cloned().unwrap_or_default())
    }

    fn clear_steps(&self, run_id: &str) -> Result<(), StorageError> {
        self.steps.write().remove(run_id);
        Ok(())
    }
}
