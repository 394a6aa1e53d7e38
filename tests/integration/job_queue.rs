//! Background execution through the job queue

use std::time::Duration;

use lexicast::job::JobStatus;

use super::support::{markdown, openai_params, Harness};

#[tokio::test]
async fn started_jobs_run_in_the_background() {
    let h = Harness::new();
    let first = h
        .lexicast
        .start_job("doc-1", markdown("First document."), openai_params(), None)
        .unwrap();
    let second = h
        .lexicast
        .start_job("doc-2", markdown("Second document."), openai_params(), None)
        .unwrap();

    h.lexicast
        .wait_for_idle(Some(Duration::from_secs(10)))
        .await
        .unwrap();

    for key in [&first, &second] {
        let view = h.lexicast.get_job_status(key).unwrap().unwrap();
        assert_eq!(view.status, JobStatus::Ready);
        assert_eq!(view.progress(), 1.0);
    }
    assert_eq!(h.lexicast.queue_stats().completed, 2);
    assert_eq!(h.lexicast.list_jobs().unwrap().len(), 2);
    h.lexicast.shutdown().await;
}

#[tokio::test]
async fn ready_jobs_are_not_queued_again() {
    let h = Harness::new();
    let key = h
        .lexicast
        .start_job("doc-1", markdown("Only once."), openai_params(), None)
        .unwrap();
    h.lexicast
        .wait_for_idle(Some(Duration::from_secs(10)))
        .await
        .unwrap();

    let again = h
        .lexicast
        .start_job("doc-1", markdown("Only once."), openai_params(), None)
        .unwrap();
    assert_eq!(again, key);
    h.lexicast
        .wait_for_idle(Some(Duration::from_secs(10)))
        .await
        .unwrap();

    assert_eq!(h.speech.calls(), 1);
    assert_eq!(h.lexicast.queue_stats().completed, 1);
    h.lexicast.shutdown().await;
}
