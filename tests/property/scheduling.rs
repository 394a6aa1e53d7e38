//! Job scheduling picks only due jobs, earliest first

use lexicast::job::{due_jobs, is_due, JobRecord, JobStatus, MAX_JOB_ATTEMPTS};
use lexicast::types::{Fingerprint, JobKey, JobKind};
use proptest::prelude::*;

fn status() -> impl Strategy<Value = JobStatus> {
    prop_oneof![
        Just(JobStatus::Queued),
        Just(JobStatus::Processing),
        Just(JobStatus::Ready),
        Just(JobStatus::Error),
        Just(JobStatus::Stale),
    ]
}

fn record() -> impl Strategy<Value = JobRecord> {
    (
        "[a-f0-9]{8}",
        status(),
        0u32..8,
        prop::option::of(0u64..10_000),
        0u64..10_000,
    )
        .prop_map(|(key, status, attempts, next_run_at_ms, created_at_ms)| JobRecord {
            key: JobKey::new(key),
            entity_id: "entity".to_string(),
            kind: JobKind::DocumentTts,
            version: Fingerprint::from_hex("v"),
            status,
            planned_count: 0,
            completed_count: 0,
            last_error: None,
            manifest_ref: None,
            stitched_ref: None,
            attempts,
            next_run_at_ms,
            created_at_ms,
            updated_at_ms: created_at_ms,
        })
}

proptest! {
    #[test]
    fn due_jobs_are_bounded_due_and_ordered(
        records in prop::collection::vec(record(), 0..50),
        now in 0u64..10_000,
        limit in 0usize..20,
    ) {
        let eligible = records.iter().filter(|r| is_due(r, now)).count();
        let due = due_jobs(records, now, limit);

        prop_assert_eq!(due.len(), eligible.min(limit));
        for record in &due {
            prop_assert!(is_due(record, now));
            prop_assert!(record.attempts < MAX_JOB_ATTEMPTS);
            prop_assert!(matches!(record.status, JobStatus::Queued | JobStatus::Error));
        }
        for pair in due.windows(2) {
            prop_assert!(pair[0].next_run_at_ms.unwrap_or(0) <= pair[1].next_run_at_ms.unwrap_or(0));
        }
    }
}
