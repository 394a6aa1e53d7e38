//! Themed thumbnail rendering

use lexicast::entity::EntityStore;
use lexicast::job::{JobContent, JobRequest, JobStatus, JobStatusStore};
use lexicast::pipeline::JobOutcome;
use lexicast::thumbnail::Theme;

use super::support::{thumbnail_params, Harness};

fn drawing(content: &str) -> JobContent {
    JobContent::Entity {
        content: content.to_string(),
    }
}

#[tokio::test]
async fn renders_one_image_per_theme() {
    let h = Harness::new();
    let request = h
        .lexicast
        .prepare_request("drawing-1", drawing(r#"{"shapes":[1,2,3]}"#), thumbnail_params(), None)
        .unwrap();

    let outcome = h.lexicast.run_job(&request).await.unwrap();
    let JobOutcome::Ready(done) = outcome else {
        panic!("expected ready, got {outcome:?}");
    };
    assert_eq!(h.renderer.calls(), 2);
    let themes: Vec<&str> = done.variants.keys().map(String::as_str).collect();
    assert_eq!(themes, vec!["dark", "light"]);
    assert!(done.variants.values().all(|url| url.ends_with(".webp")));
    assert!(done.stitched_ref.is_none());

    let urls = h.renderer.urls();
    assert!(urls
        .iter()
        .all(|url| url.starts_with("http://localhost:3000/screenshot/documents/drawing-1")));
    assert!(urls[0].contains("width=640"));

    let snapshot = h.entities.get_snapshot("drawing-1").unwrap().unwrap();
    assert_eq!(snapshot.slot("thumbnail").unwrap()["status"], "ready");
}

#[tokio::test]
async fn a_failing_theme_fails_the_whole_job() {
    let h = Harness::new();
    h.renderer.fail_on(Theme::Dark);
    let request = h
        .lexicast
        .prepare_request("drawing-1", drawing("{}"), thumbnail_params(), None)
        .unwrap();

    let outcome = h.lexicast.run_job(&request).await.unwrap();
    assert!(matches!(outcome, JobOutcome::Failed { .. }));
    let record = h.jobs.get(&request.key).unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Error);
    assert!(record.manifest_ref.is_none());
}

#[tokio::test]
async fn batch_summary_counts_each_job() {
    let h = Harness::new();
    let ready = h
        .lexicast
        .prepare_request("drawing-1", drawing("{\"a\":1}"), thumbnail_params(), None)
        .unwrap();
    // never recorded on an entity, so it is stale on arrival
    let orphan = JobRequest::new("drawing-2", drawing("{\"b\":2}"), thumbnail_params(), None).unwrap();

    let summary = h
        .lexicast
        .process_thumbnail_batch(&[ready.clone(), orphan.clone()])
        .await;
    assert_eq!(summary.total, 2);
    assert_eq!(summary.successful, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.results[0].job_key, ready.key);
    assert_eq!(summary.results[0].variants.len(), 2);
    assert_eq!(summary.results[1].entity_id, "drawing-2");
    assert!(summary.results[1].error.is_some());
}
