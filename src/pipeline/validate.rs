//! Staleness and duplicate checks against the owning entity.

use tracing::{info, warn};

use crate::entity::{EntitySnapshot, EntityStore};
use crate::error::PipelineError;
use crate::fingerprint::{fingerprint_from_digest, is_stale};
use crate::job::{JobRequest, JobStatusStore};
use crate::pipeline::persist::{ManifestSummary, READY_STATUS};

/// Check that the request still describes the entity's current content.
///
/// A missing entity or a changed fingerprint marks the job `stale` and fails fatally. When the
/// entity already records ready output for this exact version, fails with `DuplicateReady`.
pub fn validate(
    entities: &dyn EntityStore,
    jobs: &dyn JobStatusStore,
    request: &JobRequest,
) -> Result<EntitySnapshot, PipelineError> {
    let Some(snapshot) = entities.get_snapshot(&request.entity_id)? else {
        warn!(job_key = %request.key, entity_id = %request.entity_id, "Entity missing, job is stale");
        jobs.mark_stale(&request.key)?;
        return Err(PipelineError::EntityMissing(request.entity_id.clone()));
    };

    let current = fingerprint_from_digest(&snapshot.content_fingerprint, &request.params);
    if is_stale(&request.version, &current) {
        warn!(
            job_key = %request.key,
            expected = %request.version,
            actual = %current,
            "Entity changed since the job was requested"
        );
        jobs.mark_stale(&request.key)?;
        return Err(PipelineError::StaleVersion {
            expected: request.version.to_string(),
            actual: current.to_string(),
        });
    }

    if let Some(existing) = ready_summary(&snapshot, request) {
        info!(job_key = %request.key, "Output for this version already recorded");
        return Err(PipelineError::DuplicateReady {
            manifest_ref: Some(existing.manifest_ref),
            stitched_ref: existing.stitched_ref,
            unit_count: existing.unit_count,
        });
    }

    Ok(snapshot)
}

fn ready_summary(snapshot: &EntitySnapshot, request: &JobRequest) -> Option<ManifestSummary> {
    let slot = snapshot.slot(request.kind.entity_slot())?;
    let summary: ManifestSummary = serde_json::from_value(slot.clone()).ok()?;
    (summary.status == READY_STATUS && summary.version == request.version.as_str())
        .then_some(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::MemoryEntityStore;
    use crate::job::{JobContent, JobParams, JobStatus, MemoryJobStore};
    use crate::tts::params::TtsParams;
    use serde_json::json;

    fn request(markdown: &str) -> JobRequest {
        JobRequest::new(
            "doc-1",
            JobContent::Markdown {
                markdown: markdown.to_string(),
            },
            JobParams::Tts(TtsParams::default()),
            None,
        )
        .unwrap()
    }

    #[test]
    fn current_entity_passes() {
        let entities = MemoryEntityStore::new();
        let jobs = MemoryJobStore::new();
        entities.put_content("doc-1", "Hello.").unwrap();
        let req = request("Hello.");
        jobs.upsert_queued(&req).unwrap();
        assert!(validate(&entities, &jobs, &req).is_ok());
    }

    #[test]
    fn missing_entity_marks_stale() {
        let entities = MemoryEntityStore::new();
        let jobs = MemoryJobStore::new();
        let req = request("Hello.");
        jobs.upsert_queued(&req).unwrap();
        let err = validate(&entities, &jobs, &req).unwrap_err();
        assert!(matches!(err, PipelineError::EntityMissing(_)));
        assert_eq!(jobs.get(&req.key).unwrap().unwrap().status, JobStatus::Stale);
    }

    #[test]
    fn changed_content_marks_stale() {
        let entities = MemoryEntityStore::new();
        let jobs = MemoryJobStore::new();
        let req = request("Hello.");
        jobs.upsert_queued(&req).unwrap();
        entities.put_content("doc-1", "Hello, edited.").unwrap();
        let err = validate(&entities, &jobs, &req).unwrap_err();
        assert!(matches!(err, PipelineError::StaleVersion { .. }));
        assert!(!err.is_retryable());
        assert_eq!(jobs.get(&req.key).unwrap().unwrap().status, JobStatus::Stale);
    }

    #[test]
    fn ready_output_for_the_same_version_is_a_duplicate() {
        let entities = MemoryEntityStore::new();
        let jobs = MemoryJobStore::new();
        let req = request("Hello.");
        entities.put_content("doc-1", "Hello.").unwrap();
        entities
            .merge_state(
                "doc-1",
                "tts_document",
                json!({
                    "job_key": req.key.as_str(),
                    "version": req.version.as_str(),
                    "status": "ready",
                    "manifest_ref": "memory://objects/tts/doc/k/manifest.json",
                    "stitched_ref": "memory://objects/tts/doc/k/full.mp3",
                    "unit_count": 1,
                    "total_chars": 6,
                    "provider": "openai",
                    "updated_at_ms": 1
                }),
            )
            .unwrap();
        let err = validate(&entities, &jobs, &req).unwrap_err();
        match err {
            PipelineError::DuplicateReady {
                manifest_ref,
                stitched_ref,
                unit_count,
            } => {
                assert_eq!(
                    manifest_ref.as_deref(),
                    Some("memory://objects/tts/doc/k/manifest.json")
                );
                assert_eq!(
                    stitched_ref.as_deref(),
                    Some("memory://objects/tts/doc/k/full.mp3")
                );
                assert_eq!(unit_count, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
