//! Step executor: one unit, idempotently.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::pipeline::unit::{UnitGenerator, UnitPayload, UnitResult};
use crate::planner::PlannedUnit;
use crate::retry::{with_backoff, RetryPolicy};
use crate::storage::ObjectStore;

#[derive(Clone)]
pub struct StepExecutor {
    store: Arc<dyn ObjectStore>,
    provider_retry: RetryPolicy,
    upload_retry: RetryPolicy,
}

impl StepExecutor {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self::with_policies(store, RetryPolicy::provider(), RetryPolicy::upload())
    }

    pub fn with_policies(
        store: Arc<dyn ObjectStore>,
        provider_retry: RetryPolicy,
        upload_retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            provider_retry,
            upload_retry,
        }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Make sure the unit's output exists in storage and return its reference.
    ///
    /// Existing output is returned without calling the provider. Concurrent or repeated calls
    /// for the same unit write the same bytes to the same key, so they converge.
    pub async fn ensure_unit_processed<G>(
        &self,
        unit: &PlannedUnit<G::Payload>,
        generator: &G,
    ) -> Result<UnitResult, PipelineError>
    where
        G: UnitGenerator,
    {
        let key = generator.storage_key(unit);

        let exists = match self.store.head_exists(&key).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(key = %key, error = %e, "Existence probe failed, regenerating");
                false
            }
        };
        if exists {
            debug!(index = unit.index, content_hash = %unit.content_hash, "Reusing stored output");
            return Ok(result_for(unit, &key, self.store.url_for(&key), true));
        }

        let label = format!("generate unit {}", unit.index);
        let bytes = with_backoff(&self.provider_retry, &label, move || generator.generate(unit)).await?;

        let store = &self.store;
        let key_ref = key.as_str();
        let body = bytes.as_slice();
        let content_type = generator.content_type();
        let output_ref = with_backoff(&self.upload_retry, "upload", move || async move {
            store
                .put(key_ref, body, content_type)
                .await
                .map_err(|e| PipelineError::Upload(e.to_string()))
        })
        .await?;

        debug!(
            index = unit.index,
            content_hash = %unit.content_hash,
            bytes = bytes.len(),
            "Stored generated output"
        );
        Ok(result_for(unit, &key, output_ref, false))
    }
}

fn result_for<P: UnitPayload>(
    unit: &PlannedUnit<P>,
    key: &str,
    output_ref: String,
    reused: bool,
) -> UnitResult {
    UnitResult {
        index: unit.index,
        output_ref,
        storage_key: key.to_string(),
        content_hash: unit.content_hash.clone(),
        source_text: unit.payload.source_text().map(str::to_string),
        section: unit.payload.section().cloned(),
        label: unit.payload.label().map(str::to_string),
        reused,
    }
}
