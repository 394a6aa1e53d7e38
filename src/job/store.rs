//! Job status persistence.
//!
//! Stores only know how to read and write whole records; the state machine lives on
//! [`JobRecord`]. Records are owned by their key, so a read-modify-write per key is enough.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use parking_lot::RwLock;
use sled::{Db, Tree};
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::job::record::JobRecord;
use crate::job::request::JobRequest;
use crate::types::{now_millis, JobKey};

const TREE_JOBS: &str = "jobs";

pub trait JobStatusStore: Send + Sync {
    fn get(&self, key: &JobKey) -> Result<Option<JobRecord>, StorageError>;

    fn put(&self, record: &JobRecord) -> Result<(), StorageError>;

    fn list(&self) -> Result<Vec<JobRecord>, StorageError>;

    /// Create the job, or re-queue it when it previously ended in `error` or `stale`.
    fn upsert_queued(&self, request: &JobRequest) -> Result<JobRecord, StorageError> {
        let now = now_millis();
        match self.get(&request.key)? {
            Some(mut existing) => {
                if existing.requeue(now) {
                    debug!(job_key = %request.key, "Re-queued job");
                    self.put(&existing)?;
                }
                Ok(existing)
            }
            None => {
                let record = JobRecord::queued(request, now);
                self.put(&record)?;
                Ok(record)
            }
        }
    }

    fn mark_processing(
        &self,
        key: &JobKey,
        planned_count: usize,
    ) -> Result<Option<JobRecord>, StorageError> {
        transition(self, key, "processing", |r, now| {
            r.begin_processing(planned_count, now)
        })
    }

    fn update_progress(
        &self,
        key: &JobKey,
        completed_count: usize,
    ) -> Result<Option<JobRecord>, StorageError> {
        transition(self, key, "progress", |r, now| {
            r.record_progress(completed_count, now)
        })
    }

    fn mark_ready(
        &self,
        key: &JobKey,
        manifest_ref: &str,
        stitched_ref: Option<&str>,
        unit_count: usize,
    ) -> Result<Option<JobRecord>, StorageError> {
        transition(self, key, "ready", |r, now| {
            r.complete(manifest_ref, stitched_ref, unit_count, now)
        })
    }

    fn mark_error(&self, key: &JobKey, message: &str) -> Result<Option<JobRecord>, StorageError> {
        transition(self, key, "error", |r, now| r.fail(message, now))
    }

    /// Like [`mark_error`](Self::mark_error), without scheduling a retry.
    fn mark_failed(&self, key: &JobKey, message: &str) -> Result<Option<JobRecord>, StorageError> {
        transition(self, key, "failed", |r, now| r.fail_permanently(message, now))
    }

    fn mark_stale(&self, key: &JobKey) -> Result<Option<JobRecord>, StorageError> {
        transition(self, key, "stale", |r, now| r.mark_stale(now))
    }
}

fn transition<S, F>(
    store: &S,
    key: &JobKey,
    label: &str,
    apply: F,
) -> Result<Option<JobRecord>, StorageError>
where
    S: JobStatusStore + ?Sized,
    F: FnOnce(&mut JobRecord, u64) -> bool,
{
    let Some(mut record) = store.get(key)? else {
        warn!(job_key = %key, transition = label, "Transition for unknown job ignored");
        return Ok(None);
    };
    if apply(&mut record, now_millis()) {
        store.put(&record)?;
    } else {
        debug!(
            job_key = %key,
            transition = label,
            status = %record.status,
            "Transition was a no-op"
        );
    }
    Ok(Some(record))
}

/// Durable job store on a sled tree keyed by job key.
#[derive(Clone)]
pub struct SledJobStore {
    jobs: Tree,
}

impl SledJobStore {
    pub fn new(db: &Db) -> Result<Self, StorageError> {
        let jobs = db.open_tree(TREE_JOBS).map_err(to_storage_io)?;
        Ok(Self { jobs })
    }

    pub fn shared(db: &Db) -> Result<Arc<Self>, StorageError> {
        Ok(Arc::new(Self::new(db)?))
    }
}

impl JobStatusStore for SledJobStore {
    fn get(&self, key: &JobKey) -> Result<Option<JobRecord>, StorageError> {
        let Some(raw) = self
            .jobs
            .get(key.as_str().as_bytes())
            .map_err(to_storage_io)?
        else {
            return Ok(None);
        };
        let parsed = serde_json::from_slice(&raw).map_err(to_storage_data)?;
        Ok(Some(parsed))
    }

    fn put(&self, record: &JobRecord) -> Result<(), StorageError> {
        let value = serde_json::to_vec(record).map_err(to_storage_data)?;
        self.jobs
            .insert(record.key.as_str().as_bytes(), value)
            .map_err(to_storage_io)?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<JobRecord>, StorageError> {
        let mut out = Vec::new();
        for result in self.jobs.iter() {
            let (_, value) = result.map_err(to_storage_io)?;
            let rec: JobRecord = serde_json::from_slice(&value).map_err(to_storage_data)?;
            out.push(rec);
        }
        out.sort_by_key(|r| std::cmp::Reverse(r.updated_at_ms));
        Ok(out)
    }
}

/// In-process job store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<JobKey, JobRecord>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStatusStore for MemoryJobStore {
    fn get(&self, key: &JobKey) -> Result<Option<JobRecord>, StorageError> {
        Ok(self.jobs.read().get(key).cloned())
    }

    fn put(&self, record: &JobRecord) -> Result<(), StorageError> {
        self.jobs.write().insert(record.key.clone(), record.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<JobRecord>, StorageError> {
        let mut out: Vec<JobRecord> = self.jobs.read().values().cloned().collect();
        out.sort_by_key(|r| std::cmp::Reverse(r.updated_at_ms));
        Ok(out)
    }
}

pub(crate) fn to_storage_io(err: sled::Error) -> StorageError {
    StorageError::IoError(io::Error::new(io::ErrorKind::Other, err.to_string()))
}

pub(crate) fn to_storage_data(err: serde_json::Error) -> StorageError {
    StorageError::IoError(io::Error::new(io::ErrorKind::InvalidData, err.to_string()))
}
