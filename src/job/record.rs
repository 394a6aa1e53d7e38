//! Job status record and its state machine.
//!
//! `queued → processing → {ready, error, stale}`. Each transition is a method that reports
//! whether it changed anything, so replayed writes restate rather than fail. `ready` is sticky.

use serde::{Deserialize, Serialize};

use crate::job::request::JobRequest;
use crate::job::schedule::backoff_delay;
use crate::types::{Fingerprint, JobKey, JobKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Ready,
    Error,
    Stale,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Ready => "ready",
            JobStatus::Error => "error",
            JobStatus::Stale => "stale",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Ready | JobStatus::Error | JobStatus::Stale)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub key: JobKey,
    pub entity_id: String,
    pub kind: JobKind,
    pub version: Fingerprint,
    pub status: JobStatus,
    pub planned_count: usize,
    pub completed_count: usize,
    pub last_error: Option<String>,
    pub manifest_ref: Option<String>,
    pub stitched_ref: Option<String>,
    pub attempts: u32,
    pub next_run_at_ms: Option<u64>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

impl JobRecord {
    pub fn queued(request: &JobRequest, now_ms: u64) -> Self {
        Self {
            key: request.key.clone(),
            entity_id: request.entity_id.clone(),
            kind: request.kind,
            version: request.version.clone(),
            status: JobStatus::Queued,
            planned_count: 0,
            completed_count: 0,
            last_error: None,
            manifest_ref: None,
            stitched_ref: None,
            attempts: 0,
            next_run_at_ms: None,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        }
    }

    /// Put an `error` or `stale` job back in the queue. Other states are left alone.
    pub fn requeue(&mut self, now_ms: u64) -> bool {
        if !matches!(self.status, JobStatus::Error | JobStatus::Stale) {
            return false;
        }
        self.status = JobStatus::Queued;
        self.last_error = None;
        self.next_run_at_ms = None;
        self.updated_at_ms = now_ms;
        true
    }

    /// Enter `processing`. Counts an attempt and leases the job until the backoff expires.
    pub fn begin_processing(&mut self, planned_count: usize, now_ms: u64) -> bool {
        match self.status {
            JobStatus::Ready | JobStatus::Stale => return false,
            JobStatus::Processing => {}
            JobStatus::Queued | JobStatus::Error => {
                self.attempts += 1;
                self.next_run_at_ms = Some(now_ms + backoff_delay(self.attempts).as_millis() as u64);
                self.completed_count = 0;
            }
        }
        self.status = JobStatus::Processing;
        self.planned_count = planned_count;
        self.updated_at_ms = now_ms;
        true
    }

    pub fn record_progress(&mut self, completed_count: usize, now_ms: u64) -> bool {
        if self.status != JobStatus::Processing {
            return false;
        }
        self.completed_count = completed_count;
        self.updated_at_ms = now_ms;
        true
    }

    pub fn complete(
        &mut self,
        manifest_ref: &str,
        stitched_ref: Option<&str>,
        unit_count: usize,
        now_ms: u64,
    ) -> bool {
        if self.status == JobStatus::Ready {
            return false;
        }
        self.status = JobStatus::Ready;
        self.manifest_ref = Some(manifest_ref.to_string());
        self.stitched_ref = stitched_ref.map(str::to_string);
        self.planned_count = self.planned_count.max(unit_count);
        self.completed_count = unit_count;
        self.last_error = None;
        self.next_run_at_ms = None;
        self.updated_at_ms = now_ms;
        true
    }

    /// Record a failure. The lease set on entering processing becomes the next run time.
    pub fn fail(&mut self, message: &str, now_ms: u64) -> bool {
        if self.status == JobStatus::Ready {
            return false;
        }
        self.status = JobStatus::Error;
        self.last_error = Some(message.to_string());
        if self.next_run_at_ms.is_none() {
            self.next_run_at_ms =
                Some(now_ms + backoff_delay(self.attempts.max(1)).as_millis() as u64);
        }
        self.updated_at_ms = now_ms;
        true
    }

    /// Record a failure that retrying cannot fix. The job is never picked up again.
    pub fn fail_permanently(&mut self, message: &str, now_ms: u64) -> bool {
        if self.status == JobStatus::Ready {
            return false;
        }
        self.status = JobStatus::Error;
        self.last_error = Some(message.to_string());
        self.next_run_at_ms = None;
        self.updated_at_ms = now_ms;
        true
    }

    pub fn mark_stale(&mut self, now_ms: u64) -> bool {
        if matches!(self.status, JobStatus::Ready | JobStatus::Stale) {
            return false;
        }
        self.status = JobStatus::Stale;
        self.next_run_at_ms = None;
        self.updated_at_ms = now_ms;
        true
    }
}

/// Read-only projection returned to callers polling a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusView {
    pub key: JobKey,
    pub kind: JobKind,
    pub status: JobStatus,
    pub planned_count: usize,
    pub completed_count: usize,
    pub manifest_ref: Option<String>,
    pub stitched_ref: Option<String>,
    pub last_error: Option<String>,
    pub attempts: u32,
    pub updated_at_ms: u64,
}

impl JobStatusView {
    /// Completion ratio in `[0, 1]`; zero before planning.
    pub fn progress(&self) -> f64 {
        if self.planned_count == 0 {
            return 0.0;
        }
        (self.completed_count as f64 / self.planned_count as f64).min(1.0)
    }
}

impl From<&JobRecord> for JobStatusView {
    fn from(record: &JobRecord) -> Self {
        Self {
            key: record.key.clone(),
            kind: record.kind,
            status: record.status,
            planned_count: record.planned_count,
            completed_count: record.completed_count,
            manifest_ref: record.manifest_ref.clone(),
            stitched_ref: record.stitched_ref.clone(),
            last_error: record.last_error.clone(),
            attempts: record.attempts,
            updated_at_ms: record.updated_at_ms,
        }
    }
}
