//! Merge finished output into the owning entity's state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::entity::EntityStore;
use crate::error::PipelineError;
use crate::pipeline::finalize::FinalizeOutcome;
use crate::types::{now_millis, JobKey};

pub const READY_STATUS: &str = "ready";

/// What an entity records about its latest ready output of one kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestSummary {
    pub job_key: JobKey,
    pub version: String,
    pub status: String,
    pub manifest_ref: String,
    #[serde(default)]
    pub stitched_ref: Option<String>,
    pub unit_count: usize,
    pub total_chars: usize,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variants: BTreeMap<String, String>,
    pub provider: String,
    pub updated_at_ms: u64,
}

impl ManifestSummary {
    pub fn ready(job_key: &JobKey, version: &str, provider: &str, outcome: &FinalizeOutcome) -> Self {
        Self {
            job_key: job_key.clone(),
            version: version.to_string(),
            status: READY_STATUS.to_string(),
            manifest_ref: outcome.manifest_ref.clone(),
            stitched_ref: outcome.stitched_ref.clone(),
            unit_count: outcome.unit_count,
            total_chars: outcome.total_chars,
            variants: outcome.variants.clone(),
            provider: provider.to_string(),
            updated_at_ms: now_millis(),
        }
    }
}

/// Returns `false` when the entity no longer exists; that is not an error.
pub fn persist(
    entities: &dyn EntityStore,
    entity_id: &str,
    slot: &str,
    summary: &ManifestSummary,
) -> Result<bool, PipelineError> {
    let patch = serde_json::to_value(summary)?;
    let merged = entities.merge_state(entity_id, slot, patch)?;
    if merged {
        info!(entity_id, slot, job_key = %summary.job_key, "Recorded output on entity");
    } else {
        debug!(entity_id, slot, "Entity gone, nothing to record");
    }
    Ok(merged)
}
