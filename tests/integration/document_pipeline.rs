//! End-to-end narration of markdown documents and articles

use lexicast::entity::EntityStore;
use lexicast::job::{JobContent, JobStatus, JobStatusStore};
use lexicast::pipeline::{JobOutcome, Manifest};
use lexicast::storage::ObjectStore;
use lexicast::types::JobKind;

use std::sync::Arc;

use lexicast::config::LexicastConfig;
use lexicast::job::MemoryJobStore;
use lexicast::workflow::MemoryStepLog;
use lexicast::Lexicast;

use super::support::{context, markdown, openai_params, registry, three_chunk_document, Harness};

const LEADS: [&str; 6] = ["Alpha", "Bravo", "Charlie", "Delta", "Echo", "Foxtrot"];

#[tokio::test]
async fn document_is_chunked_generated_and_recorded() {
    let h = Harness::new();
    let doc = three_chunk_document(LEADS);
    let request = h
        .lexicast
        .prepare_request("doc-1", markdown(&doc), openai_params(), Some("Notes".to_string()))
        .unwrap();

    let outcome = h.lexicast.run_job(&request).await.unwrap();
    let JobOutcome::Ready(done) = outcome else {
        panic!("expected ready, got {outcome:?}");
    };
    assert_eq!(done.unit_count, 3);
    assert_eq!(h.speech.calls(), 3);
    assert!(done.total_chars > 2900);

    let manifest_key = format!("tts/doc/{}/manifest.json", request.key);
    let body = h.objects.get(&manifest_key).await.unwrap().unwrap();
    let manifest: Manifest = serde_json::from_slice(&body).unwrap();
    assert_eq!(manifest.kind, JobKind::DocumentTts);
    assert_eq!(manifest.title.as_deref(), Some("Notes"));
    assert_eq!(manifest.voice_id.as_deref(), Some("alloy"));
    let indices: Vec<usize> = manifest.segments.iter().map(|s| s.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    let chars: usize = manifest
        .segments
        .iter()
        .map(|s| s.text.as_deref().unwrap_or_default().chars().count())
        .sum();
    assert_eq!(manifest.total_chars, chars);
    assert_eq!(h.objects.keys().iter().filter(|k| k.starts_with("tts/chunks/")).count(), 3);
    assert!(manifest.segments[0]
        .text
        .as_deref()
        .unwrap()
        .starts_with("Alpha"));

    let full_key = format!("tts/doc/{}/full.mp3", request.key);
    let full = h.objects.get(&full_key).await.unwrap().unwrap();
    let segments: Vec<u8> = h
        .speech
        .inputs()
        .iter()
        .flat_map(|input| input.as_bytes().to_vec())
        .collect();
    assert_eq!(full.len(), segments.len());
    assert!(full.starts_with(b"Alpha"));
    assert_eq!(done.stitched_ref.as_deref(), Some(h.objects.url_for(&full_key).as_str()));
    assert_eq!(manifest.stitched_url, done.stitched_ref);

    let record = h.jobs.get(&request.key).unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Ready);
    assert_eq!(record.completed_count, 3);
    assert_eq!(record.manifest_ref.as_deref(), Some(done.manifest_ref.as_str()));
    assert_eq!(record.stitched_ref, done.stitched_ref);

    let snapshot = h.entities.get_snapshot("doc-1").unwrap().unwrap();
    let slot = snapshot.slot("tts_document").unwrap();
    assert_eq!(slot["status"], "ready");
    assert_eq!(slot["version"], request.version.as_str());
}

#[tokio::test]
async fn repeated_request_does_not_call_the_provider() {
    let h = Harness::new();
    let doc = three_chunk_document(LEADS);
    let request = h
        .lexicast
        .prepare_request("doc-1", markdown(&doc), openai_params(), None)
        .unwrap();

    assert!(h.lexicast.run_job(&request).await.unwrap().is_ready());
    let puts = h.objects.put_count();

    let again = h.lexicast.run_job(&request).await.unwrap();
    assert!(matches!(
        again,
        JobOutcome::Duplicate {
            manifest_ref: Some(_)
        }
    ));
    assert_eq!(h.speech.calls(), 3);
    assert_eq!(h.objects.put_count(), puts);
}

#[tokio::test]
async fn output_recorded_on_the_entity_restores_a_lost_job_record() {
    let h = Harness::new();
    let doc = three_chunk_document(LEADS);
    let request = h
        .lexicast
        .prepare_request("doc-1", markdown(&doc), openai_params(), None)
        .unwrap();
    let JobOutcome::Ready(done) = h.lexicast.run_job(&request).await.unwrap() else {
        panic!("expected ready");
    };

    // same objects and entities, no job history
    let jobs = Arc::new(MemoryJobStore::new());
    let ctx = context(
        h.objects.clone(),
        jobs.clone(),
        h.entities.clone(),
        Arc::new(MemoryStepLog::new()),
    );
    let fresh = Lexicast::with_context(ctx, registry(&h.speech, &h.renderer), &LexicastConfig::default());

    let outcome = fresh.run_job(&request).await.unwrap();
    assert_eq!(
        outcome,
        JobOutcome::Duplicate {
            manifest_ref: Some(done.manifest_ref.clone())
        }
    );
    assert_eq!(h.speech.calls(), 3);

    let record = jobs.get(&request.key).unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Ready);
    assert_eq!(record.completed_count, 3);
    assert_eq!(record.planned_count, 3);
    assert_eq!(record.manifest_ref.as_deref(), Some(done.manifest_ref.as_str()));
    assert!(record.stitched_ref.is_some());
    assert_eq!(record.stitched_ref, done.stitched_ref);
}

#[tokio::test]
async fn identical_chunks_are_shared_across_entities() {
    let h = Harness::new();
    let doc = three_chunk_document(LEADS);
    let first = h
        .lexicast
        .prepare_request("doc-1", markdown(&doc), openai_params(), None)
        .unwrap();
    let second = h
        .lexicast
        .prepare_request("doc-2", markdown(&doc), openai_params(), None)
        .unwrap();
    assert_ne!(first.key, second.key);

    h.lexicast.run_job(&first).await.unwrap();
    let outcome = h.lexicast.run_job(&second).await.unwrap();

    let JobOutcome::Ready(done) = outcome else {
        panic!("expected ready, got {outcome:?}");
    };
    assert_eq!(done.unit_count, 3);
    assert_eq!(h.speech.calls(), 3);
}

#[tokio::test]
async fn edited_entity_makes_the_job_stale() {
    let h = Harness::new();
    let request = h
        .lexicast
        .prepare_request("doc-1", markdown("# Draft\n\nFirst words."), openai_params(), None)
        .unwrap();
    h.entities
        .put_content("doc-1", "# Draft\n\nSecond thoughts.")
        .unwrap();

    let outcome = h.lexicast.run_job(&request).await.unwrap();
    assert!(matches!(outcome, JobOutcome::Stale { .. }));
    assert_eq!(h.speech.calls(), 0);
    let record = h.jobs.get(&request.key).unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Stale);
}

#[tokio::test]
async fn deleted_entity_makes_the_job_stale() {
    let h = Harness::new();
    let request = h
        .lexicast
        .prepare_request("doc-1", markdown("Some words."), openai_params(), None)
        .unwrap();
    h.entities.delete("doc-1").unwrap();

    let outcome = h.lexicast.run_job(&request).await.unwrap();
    assert!(matches!(outcome, JobOutcome::Stale { .. }));
    assert_eq!(h.speech.calls(), 0);
}

#[tokio::test]
async fn empty_document_fails_without_retry() {
    let h = Harness::new();
    let request = h
        .lexicast
        .prepare_request("doc-1", markdown("   \n\n  "), openai_params(), None)
        .unwrap();

    let outcome = h.lexicast.run_job(&request).await.unwrap();
    assert!(matches!(
        outcome,
        JobOutcome::Failed {
            retryable: false,
            ..
        }
    ));
    let record = h.jobs.get(&request.key).unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Error);
    assert_eq!(record.next_run_at_ms, None);
}

#[tokio::test]
async fn article_headings_split_sections() {
    let h = Harness::new();
    let html = "<h2>Intro</h2><p>Welcome to the article.</p><h2>Details</h2><p>Here is more.</p>";
    let content = JobContent::Article {
        plain_text: "Intro Welcome to the article. Details Here is more.".to_string(),
        html: Some(html.to_string()),
    };
    let request = h
        .lexicast
        .prepare_request("article-1", content, openai_params(), None)
        .unwrap();
    assert_eq!(request.kind, JobKind::ArticleTts);

    let outcome = h.lexicast.run_job(&request).await.unwrap();
    let JobOutcome::Ready(done) = outcome else {
        panic!("expected ready, got {outcome:?}");
    };
    assert_eq!(done.unit_count, 2);

    let body = h
        .objects
        .get(&format!("tts/article/{}/manifest.json", request.key))
        .await
        .unwrap()
        .unwrap();
    let manifest: Manifest = serde_json::from_slice(&body).unwrap();
    let titles: Vec<String> = manifest
        .segments
        .iter()
        .filter_map(|s| s.section.as_ref().and_then(|section| section.section_title.clone()))
        .collect();
    assert_eq!(titles, vec!["Intro".to_string(), "Details".to_string()]);
}
