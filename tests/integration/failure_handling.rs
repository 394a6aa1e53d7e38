//! Partial failures, total loss and rescheduling

use lexicast::config::LexicastConfig;
use lexicast::job::{JobStatus, JobStatusStore};
use lexicast::pipeline::{JobOutcome, Manifest};
use lexicast::storage::ObjectStore;
use lexicast::types::now_millis;
use lexicast::workflow::{RunStatus, StepLog};

use super::support::{markdown, openai_params, three_chunk_document, Harness};

const ONE_HOUR_MS: u64 = 60 * 60 * 1000;

#[tokio::test]
async fn tolerant_batch_keeps_the_successful_units() {
    let h = Harness::new();
    h.speech.fail_on("Charlie");
    let doc = three_chunk_document(["Alpha", "Bravo", "Charlie", "Delta", "Echo", "Foxtrot"]);
    let request = h
        .lexicast
        .prepare_request("doc-1", markdown(&doc), openai_params(), None)
        .unwrap();

    let outcome = h.lexicast.run_job(&request).await.unwrap();
    let JobOutcome::Ready(done) = outcome else {
        panic!("expected ready, got {outcome:?}");
    };
    assert_eq!(done.unit_count, 2);

    let body = h
        .objects
        .get(&format!("tts/doc/{}/manifest.json", request.key))
        .await
        .unwrap()
        .unwrap();
    let manifest: Manifest = serde_json::from_slice(&body).unwrap();
    let indices: Vec<usize> = manifest.segments.iter().map(|s| s.index).collect();
    assert_eq!(indices, vec![0, 2]);
}

#[tokio::test]
async fn strict_batch_fails_permanently_on_a_rejected_unit() {
    let mut config = LexicastConfig::default();
    config.tts.partial_failure_tolerant = false;
    let h = Harness::with_config(config);
    h.speech.fail_on("Charlie");
    let doc = three_chunk_document(["Alpha", "Bravo", "Charlie", "Delta", "Echo", "Foxtrot"]);
    let request = h
        .lexicast
        .prepare_request("doc-1", markdown(&doc), openai_params(), None)
        .unwrap();

    let outcome = h.lexicast.run_job(&request).await.unwrap();
    let JobOutcome::Failed { message, retryable } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert!(message.contains("Unit 1"));
    assert!(!retryable);
    let record = h.jobs.get(&request.key).unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Error);
    assert!(record.next_run_at_ms.is_none());
    let manifests: Vec<String> = h
        .objects
        .keys()
        .into_iter()
        .filter(|k| k.ends_with("manifest.json"))
        .collect();
    assert!(manifests.is_empty());
}

#[tokio::test]
async fn losing_every_unit_to_an_outage_schedules_a_retry() {
    let h = Harness::new();
    h.speech.set_unavailable(true);
    let request = h
        .lexicast
        .prepare_request("doc-1", markdown("Just one paragraph."), openai_params(), None)
        .unwrap();

    let outcome = h.lexicast.run_job(&request).await.unwrap();
    assert!(matches!(
        outcome,
        JobOutcome::Failed {
            retryable: true,
            ..
        }
    ));

    let record = h.jobs.get(&request.key).unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Error);
    assert_eq!(record.attempts, 1);
    assert!(record.next_run_at_ms.is_some());
    assert!(record.last_error.unwrap().contains("All units"));

    let run = h.steps.get_run(request.key.as_str()).unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
}

#[tokio::test]
async fn due_jobs_are_rerun_once_the_provider_recovers() {
    let h = Harness::new();
    h.speech.set_unavailable(true);
    let request = h
        .lexicast
        .prepare_request("doc-1", markdown("Just one paragraph."), openai_params(), None)
        .unwrap();
    h.lexicast.run_job(&request).await.unwrap();

    // nothing is due before the backoff expires
    let early = h.lexicast.process_due_jobs(0, 10).await.unwrap();
    assert!(early.is_empty());

    h.speech.set_unavailable(false);
    let runs = h
        .lexicast
        .process_due_jobs(now_millis() + ONE_HOUR_MS, 10)
        .await
        .unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].key, request.key);
    assert!(runs[0].outcome.is_ready());

    let record = h.jobs.get(&request.key).unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Ready);
    assert_eq!(record.attempts, 2);
}

#[tokio::test]
async fn rejected_units_do_not_consume_retry_budget() {
    let h = Harness::new();
    h.speech.set_reject_all(true);
    let request = h
        .lexicast
        .prepare_request("doc-1", markdown("Just one paragraph."), openai_params(), None)
        .unwrap();

    let outcome = h.lexicast.run_job(&request).await.unwrap();
    let JobOutcome::Failed { message, retryable } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert!(message.contains("All units"));
    assert!(!retryable);
    // rejections are not retried within the step either
    assert_eq!(h.speech.calls(), 1);

    let record = h.jobs.get(&request.key).unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Error);
    assert!(record.next_run_at_ms.is_none());

    h.speech.set_reject_all(false);
    let runs = h
        .lexicast
        .process_due_jobs(now_millis() + ONE_HOUR_MS, 10)
        .await
        .unwrap();
    assert!(runs.is_empty());
}

#[tokio::test]
async fn strict_batch_reschedules_a_unit_lost_to_an_outage() {
    let mut config = LexicastConfig::default();
    config.tts.partial_failure_tolerant = false;
    let h = Harness::with_config(config);
    h.speech.set_unavailable(true);
    let request = h
        .lexicast
        .prepare_request("doc-1", markdown("Just one paragraph."), openai_params(), None)
        .unwrap();

    let outcome = h.lexicast.run_job(&request).await.unwrap();
    assert!(matches!(
        outcome,
        JobOutcome::Failed {
            retryable: true,
            ..
        }
    ));
    let record = h.jobs.get(&request.key).unwrap().unwrap();
    assert!(record.next_run_at_ms.is_some());
}

#[tokio::test]
async fn permanent_failures_are_never_due() {
    let h = Harness::new();
    let request = h
        .lexicast
        .prepare_request("doc-1", markdown(""), openai_params(), None)
        .unwrap();
    h.lexicast.run_job(&request).await.unwrap();

    let runs = h
        .lexicast
        .process_due_jobs(now_millis() + ONE_HOUR_MS, 10)
        .await
        .unwrap();
    assert!(runs.is_empty());
}

#[tokio::test]
async fn budget_limit_rejects_expensive_jobs() {
    let mut config = LexicastConfig::default();
    config.tts.max_budget_usd = Some(0.000_001);
    let h = Harness::with_config(config);
    let doc = three_chunk_document(["Alpha", "Bravo", "Charlie", "Delta", "Echo", "Foxtrot"]);
    let request = h
        .lexicast
        .prepare_request("doc-1", markdown(&doc), openai_params(), None)
        .unwrap();

    let outcome = h.lexicast.run_job(&request).await.unwrap();
    let JobOutcome::Failed { message, retryable } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert!(message.contains("exceeds budget"));
    assert!(!retryable);
    assert_eq!(h.speech.calls(), 0);
}
