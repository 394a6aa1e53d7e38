//! Job-level retry schedule for failed and queued jobs.

use std::time::Duration;

use crate::job::record::{JobRecord, JobStatus};

/// Jobs that have been attempted this many times are no longer picked up.
pub const MAX_JOB_ATTEMPTS: u32 = 5;

/// Default number of jobs picked per scheduling pass
pub const DEFAULT_DUE_LIMIT: usize = 10;

pub fn backoff_delay(attempts: u32) -> Duration {
    match attempts {
        0 | 1 => Duration::from_secs(15),
        2 => Duration::from_secs(60),
        3 => Duration::from_secs(5 * 60),
        4 => Duration::from_secs(20 * 60),
        _ => Duration::from_secs(2 * 60 * 60),
    }
}

/// Queued jobs are due once their lease expires; failed jobs only while a retry is scheduled.
pub fn is_due(record: &JobRecord, now_ms: u64) -> bool {
    if record.attempts >= MAX_JOB_ATTEMPTS {
        return false;
    }
    match record.status {
        JobStatus::Queued => record.next_run_at_ms.map_or(true, |at| at <= now_ms),
        JobStatus::Error => record.next_run_at_ms.is_some_and(|at| at <= now_ms),
        _ => false,
    }
}

/// Due jobs, earliest first, at most `limit`.
pub fn due_jobs(records: Vec<JobRecord>, now_ms: u64, limit: usize) -> Vec<JobRecord> {
    let mut due: Vec<JobRecord> = records
        .into_iter()
        .filter(|r| is_due(r, now_ms))
        .collect();
    due.sort_by_key(|r| (r.next_run_at_ms.unwrap_or(0), r.created_at_ms));
    due.truncate(limit);
    due
}
