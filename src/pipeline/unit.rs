//! Unit payloads, generators and per-unit results.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::planner::{PlannedUnit, SectionInfo};

/// What a planned unit carries besides its index and hash.
pub trait UnitPayload: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Source text the unit was generated from, counted into manifest totals.
    fn source_text(&self) -> Option<&str> {
        None
    }

    fn section(&self) -> Option<&SectionInfo> {
        None
    }

    /// Variant name for units that are alternatives rather than parts (render themes).
    fn label(&self) -> Option<&str> {
        None
    }
}

/// Produces the bytes for one unit and decides where they are stored.
#[async_trait]
pub trait UnitGenerator: Send + Sync {
    type Payload: UnitPayload;

    /// Deterministic object key derived from the unit's content hash and output format.
    fn storage_key(&self, unit: &PlannedUnit<Self::Payload>) -> String;

    fn content_type(&self) -> &'static str;

    async fn generate(&self, unit: &PlannedUnit<Self::Payload>) -> Result<Vec<u8>, PipelineError>;
}

/// Outcome of producing (or finding) one unit's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitResult {
    pub index: usize,
    pub output_ref: String,
    pub storage_key: String,
    pub content_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<SectionInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// The output already existed and the provider was not called.
    pub reused: bool,
}

impl UnitResult {
    pub fn char_count(&self) -> usize {
        self.source_text
            .as_deref()
            .map_or(0, |text| text.chars().count())
    }
}
