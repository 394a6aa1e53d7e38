//! Themed thumbnail renders of visual entities.

pub mod batch;
pub mod generator;
pub mod params;
pub mod pipeline;
pub mod plan;

use serde::{Deserialize, Serialize};

pub use batch::{run_thumbnail_batch, ThumbnailBatchResult, ThumbnailBatchSummary};
pub use generator::RenderGenerator;
pub use params::{ImageFormat, Theme, ThumbnailParams};
pub use pipeline::ThumbnailPipeline;
pub use plan::{plan_variants, RenderVariant};

/// Where and how entity pages are rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    /// Origin of the application serving `/screenshot/documents/{id}`
    #[serde(default = "default_app_base_url")]
    pub app_base_url: String,
    #[serde(default = "default_selector")]
    pub selector: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Fail the job when any theme fails to render.
    #[serde(default)]
    pub partial_failure_tolerant: bool,
}

fn default_app_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_selector() -> String {
    "#screenshot-root".to_string()
}

fn default_timeout_ms() -> u64 {
    15_000
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            app_base_url: default_app_base_url(),
            selector: default_selector(),
            timeout_ms: default_timeout_ms(),
            partial_failure_tolerant: false,
        }
    }
}
