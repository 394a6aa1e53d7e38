//! Manifest assembly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::pipeline::unit::UnitResult;
use crate::planner::SectionInfo;
use crate::retry::{with_backoff, RetryPolicy};
use crate::storage::ObjectStore;
use crate::types::{JobKey, JobKind};

/// Job-level metadata recorded alongside the segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestMeta {
    pub kind: JobKind,
    pub entity_id: String,
    pub version: String,
    pub provider: String,
    /// Voice for narration; `None` for renders, whose variants carry their theme.
    pub voice_id: Option<String>,
    /// Output file extension
    pub format: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestSegment {
    pub index: usize,
    pub url: String,
    pub content_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<SectionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub id: String,
    pub kind: JobKind,
    pub entity_id: String,
    pub version: String,
    pub provider: String,
    pub voice_id: Option<String>,
    pub format: String,
    pub title: Option<String>,
    pub segments: Vec<ManifestSegment>,
    pub total_chars: usize,
    pub stitched_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizeOutcome {
    pub manifest_ref: String,
    pub stitched_ref: Option<String>,
    pub unit_count: usize,
    pub total_chars: usize,
    /// Variant label to output reference, for labelled units
    #[serde(default)]
    pub variants: BTreeMap<String, String>,
}

pub fn manifest_key(kind: JobKind, job_key: &JobKey) -> String {
    format!("{}/{}/manifest.json", kind.manifest_prefix(), job_key)
}

pub fn stitched_key(kind: JobKind, job_key: &JobKey, format: &str) -> String {
    format!("{}/{}/full.{}", kind.manifest_prefix(), job_key, format)
}

pub fn build_manifest(
    job_key: &JobKey,
    meta: &ManifestMeta,
    mut results: Vec<UnitResult>,
    stitched_url: Option<String>,
) -> Manifest {
    results.sort_by_key(|r| r.index);
    let total_chars = results.iter().map(UnitResult::char_count).sum();
    let segments = results
        .into_iter()
        .map(|r| ManifestSegment {
            index: r.index,
            url: r.output_ref,
            content_hash: r.content_hash,
            text: r.source_text,
            section: r.section,
            variant: r.label,
        })
        .collect();
    Manifest {
        id: job_key.to_string(),
        kind: meta.kind,
        entity_id: meta.entity_id.clone(),
        version: meta.version.clone(),
        provider: meta.provider.clone(),
        voice_id: meta.voice_id.clone(),
        format: meta.format.clone(),
        title: meta.title.clone(),
        segments,
        total_chars,
        stitched_url,
    }
}

/// Write the manifest for a finished job, once.
///
/// The manifest location is derived from the job key; if an object already exists there it
/// is left untouched and its reference returned. Narration jobs also get a best-effort
/// stitched file; failing to build it never fails the job.
pub async fn finalize(
    store: &dyn ObjectStore,
    upload_retry: &RetryPolicy,
    job_key: &JobKey,
    meta: &ManifestMeta,
    results: Vec<UnitResult>,
) -> Result<FinalizeOutcome, PipelineError> {
    let stitched_ref = if meta.kind == JobKind::Thumbnail {
        None
    } else {
        ensure_stitched(store, upload_retry, meta.kind, job_key, &meta.format, &results).await
    };

    let variants: BTreeMap<String, String> = results
        .iter()
        .filter_map(|r| r.label.clone().map(|label| (label, r.output_ref.clone())))
        .collect();
    let manifest = build_manifest(job_key, meta, results, stitched_ref.clone());

    let key = manifest_key(meta.kind, job_key);
    let exists = store.head_exists(&key).await.unwrap_or_else(|e| {
        warn!(key = %key, error = %e, "Manifest probe failed, writing");
        false
    });
    let manifest_ref = if exists {
        debug!(job_key = %job_key, "Manifest already present");
        store.url_for(&key)
    } else {
        let body = serde_json::to_vec_pretty(&manifest)?;
        let key_ref = key.as_str();
        let bytes = body.as_slice();
        with_backoff(upload_retry, "manifest upload", move || async move {
            store
                .put(key_ref, bytes, "application/json")
                .await
                .map_err(|e| PipelineError::Upload(e.to_string()))
        })
        .await?
    };

    Ok(FinalizeOutcome {
        manifest_ref,
        stitched_ref,
        unit_count: manifest.segments.len(),
        total_chars: manifest.total_chars,
        variants,
    })
}

/// Reference to `full.{format}` for the job, concatenating the ordered mp3 segments into it
/// when it is missing. mp3 frames concatenate cleanly; other formats are only probed.
async fn ensure_stitched(
    store: &dyn ObjectStore,
    upload_retry: &RetryPolicy,
    kind: JobKind,
    job_key: &JobKey,
    format: &str,
    results: &[UnitResult],
) -> Option<String> {
    let key = stitched_key(kind, job_key, format);
    match store.head_exists(&key).await {
        Ok(true) => return Some(store.url_for(&key)),
        Ok(false) => {}
        Err(e) => {
            warn!(key = %key, error = %e, "Stitched audio probe failed");
            return None;
        }
    }
    if format != "mp3" || results.len() < 2 {
        return None;
    }

    let mut ordered: Vec<&UnitResult> = results.iter().collect();
    ordered.sort_by_key(|r| r.index);
    let mut combined = Vec::new();
    for segment in ordered {
        match store.get(&segment.storage_key).await {
            Ok(Some(bytes)) => combined.extend_from_slice(&bytes),
            Ok(None) => {
                warn!(key = %segment.storage_key, "Segment missing, skipping stitch");
                return None;
            }
            Err(e) => {
                warn!(key = %segment.storage_key, error = %e, "Segment read failed, skipping stitch");
                return None;
            }
        }
    }

    let key_ref = key.as_str();
    let body = combined.as_slice();
    let uploaded = with_backoff(upload_retry, "stitched upload", move || async move {
        store
            .put(key_ref, body, "audio/mpeg")
            .await
            .map_err(|e| PipelineError::Upload(e.to_string()))
    })
    .await;
    match uploaded {
        Ok(url) => {
            debug!(job_key = %job_key, bytes = combined.len(), "Stored stitched audio");
            Some(url)
        }
        Err(e) => {
            warn!(key = %key, error = %e, "Stitched upload failed");
            None
        }
    }
}
