//! Several thumbnail jobs processed one after another.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::job::JobRequest;
use crate::pipeline::{JobOutcome, JobRunner};
use crate::types::JobKey;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThumbnailBatchResult {
    pub job_key: JobKey,
    pub entity_id: String,
    pub success: bool,
    /// Theme to image reference
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub variants: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThumbnailBatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<ThumbnailBatchResult>,
}

/// Run each request to completion in order. A failing job is recorded and the batch moves on.
pub async fn run_thumbnail_batch(
    runner: &JobRunner,
    requests: &[JobRequest],
) -> ThumbnailBatchSummary {
    let total = requests.len();
    let mut results = Vec::with_capacity(total);

    for (n, request) in requests.iter().enumerate() {
        info!(
            job_key = %request.key,
            entity_id = %request.entity_id,
            position = n + 1,
            total,
            "Processing thumbnail job"
        );
        let mut result = ThumbnailBatchResult {
            job_key: request.key.clone(),
            entity_id: request.entity_id.clone(),
            success: false,
            variants: BTreeMap::new(),
            error: None,
        };
        match runner.run(request).await {
            Ok(JobOutcome::Ready(outcome)) => {
                result.success = true;
                result.variants = outcome.variants;
            }
            Ok(JobOutcome::Duplicate { .. }) => {
                result.success = true;
            }
            Ok(JobOutcome::Stale { reason }) => result.error = Some(reason),
            Ok(JobOutcome::Failed { message, .. }) => result.error = Some(message),
            Err(e) => {
                warn!(job_key = %request.key, error = %e, "Thumbnail job could not be recorded");
                result.error = Some(e.to_string());
            }
        }
        results.push(result);
    }

    let successful = results.iter().filter(|r| r.success).count();
    let summary = ThumbnailBatchSummary {
        total,
        successful,
        failed: total - successful,
        results,
    };
    info!(
        total = summary.total,
        successful = summary.successful,
        failed = summary.failed,
        "Thumbnail batch complete"
    );
    summary
}
