//! Recovery of interrupted runs from the durable step log

use std::sync::Arc;

use lexicast::config::LexicastConfig;
use lexicast::entity::SledEntityStore;
use lexicast::error::PipelineError;
use lexicast::job::{JobStatus, JobStatusStore, SledJobStore};
use lexicast::pipeline::PipelineContext;
use lexicast::storage::FsObjectStore;
use lexicast::tts::{plan_document, TtsParams};
use lexicast::workflow::{RunStatus, SledStepLog, StepLog, WorkflowRun};
use lexicast::Lexicast;
use serde_json::json;
use tempfile::TempDir;

use super::support::{
    context, markdown, openai_params, registry, three_chunk_document, FakeRenderer, FakeSpeech,
    Harness,
};

struct Opened {
    lexicast: Lexicast,
    ctx: PipelineContext,
    steps: Arc<SledStepLog>,
    db: sled::Db,
}

fn open(dir: &TempDir, speech: &Arc<FakeSpeech>, config: &LexicastConfig) -> Opened {
    let db = sled::open(dir.path().join("db")).unwrap();
    let objects = Arc::new(FsObjectStore::new(dir.path().join("blobs")).unwrap());
    let steps = SledStepLog::shared(&db).unwrap();
    let ctx = context(
        objects,
        SledJobStore::shared(&db).unwrap(),
        SledEntityStore::shared(&db).unwrap(),
        steps.clone(),
    );
    let renderer = Arc::new(FakeRenderer::new());
    let lexicast = Lexicast::with_context(ctx.clone(), registry(speech, &renderer), config);
    Opened {
        lexicast,
        ctx,
        steps,
        db,
    }
}

#[tokio::test]
async fn interrupted_run_resumes_from_its_checkpoints() {
    let dir = TempDir::new().unwrap();
    let speech = Arc::new(FakeSpeech::new());
    let config = LexicastConfig::default();
    let doc = three_chunk_document(["Alpha", "Bravo", "Charlie", "Delta", "Echo", "Foxtrot"]);

    // first process: the request is recorded and planned, then the process dies
    let key = {
        let opened = open(&dir, &speech, &config);
        let request = opened
            .lexicast
            .prepare_request("doc-1", markdown(&doc), openai_params(), None)
            .unwrap();
        opened.ctx.jobs.upsert_queued(&request).unwrap();

        let run = WorkflowRun::start(
            opened.ctx.steps.clone(),
            request.key.as_str(),
            &serde_json::to_value(&request).unwrap(),
        )
        .unwrap();
        let resolved = TtsParams {
            provider: Some("openai".to_string()),
            voice_id: Some("alloy".to_string()),
            ..TtsParams::default()
        }
        .resolve(false);
        let units = plan_document(&doc, config.tts.chunk_options(), &resolved);
        run.step("plan", || async { Ok::<_, PipelineError>(units) })
            .await
            .unwrap();
        opened.db.flush().unwrap();
        request.key
    };

    let opened = open(&dir, &speech, &config);
    let resumed = opened.lexicast.resume_pending().await.unwrap();
    assert_eq!(resumed.len(), 1);
    assert_eq!(resumed[0].key, key);
    assert!(resumed[0].outcome.is_ready());
    assert_eq!(speech.calls(), 3);

    let names: Vec<String> = opened
        .steps
        .steps(key.as_str())
        .unwrap()
        .into_iter()
        .map(|step| step.name)
        .collect();
    assert_eq!(names, vec!["plan", "batch-0", "finalize", "persist"]);

    let run = opened.steps.get_run(key.as_str()).unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    let record = opened.ctx.jobs.get(&key).unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Ready);

    assert!(opened.lexicast.resume_pending().await.unwrap().is_empty());
}

#[tokio::test]
async fn job_state_survives_a_restart() {
    let dir = TempDir::new().unwrap();
    let speech = Arc::new(FakeSpeech::new());
    let config = LexicastConfig::default();

    let key = {
        let opened = open(&dir, &speech, &config);
        let request = opened
            .lexicast
            .prepare_request("doc-1", markdown("Durable words."), openai_params(), None)
            .unwrap();
        assert!(opened.lexicast.run_job(&request).await.unwrap().is_ready());
        opened.db.flush().unwrap();
        request.key
    };

    let opened = open(&dir, &speech, &config);
    let view = opened.lexicast.get_job_status(&key).unwrap().unwrap();
    assert_eq!(view.status, JobStatus::Ready);
    assert!(view.manifest_ref.is_some());

    // the entity still records the output, so a replayed request is a no-op
    let request = opened
        .lexicast
        .prepare_request("doc-1", markdown("Durable words."), openai_params(), None)
        .unwrap();
    assert!(opened.lexicast.run_job(&request).await.unwrap().is_ready());
    assert_eq!(speech.calls(), 1);
}

#[tokio::test]
async fn unreadable_run_input_is_abandoned() {
    let h = Harness::new();
    h.steps
        .begin_run("not-a-job", &json!({ "unexpected": true }))
        .unwrap();

    let resumed = h.lexicast.resume_pending().await.unwrap();
    assert!(resumed.is_empty());
    let run = h.steps.get_run("not-a-job").unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Abandoned);
}
