//! Narration of documents and articles.

pub mod generator;
pub mod params;
pub mod pipeline;
pub mod plan;
pub mod ssml;

use serde::{Deserialize, Serialize};

use crate::planner::{ChunkOptions, DEFAULT_HARD_CAP, DEFAULT_TARGET_SIZE};

pub use generator::SpeechGenerator;
pub use params::{AudioFormat, ResolvedTts, SpeechProviderKind, TtsParams};
pub use pipeline::TtsPipeline;
pub use plan::{estimate_cost, plan_article, plan_document, SpeechChunk};

/// Narration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Soft chunk size in characters, clamped to 200..=2000
    #[serde(default = "default_target_size")]
    pub target_size: usize,
    #[serde(default = "default_hard_cap")]
    pub hard_cap: usize,
    /// Chunks synthesized concurrently
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_tolerant")]
    pub partial_failure_tolerant: bool,
    /// Refuse jobs whose estimated cost exceeds this many USD
    #[serde(default)]
    pub max_budget_usd: Option<f64>,
    #[serde(default)]
    pub prices: PriceTable,
}

fn default_target_size() -> usize {
    DEFAULT_TARGET_SIZE
}

fn default_hard_cap() -> usize {
    DEFAULT_HARD_CAP
}

fn default_batch_size() -> usize {
    4
}

fn default_tolerant() -> bool {
    true
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            target_size: default_target_size(),
            hard_cap: default_hard_cap(),
            batch_size: default_batch_size(),
            partial_failure_tolerant: default_tolerant(),
            max_budget_usd: None,
            prices: PriceTable::default(),
        }
    }
}

impl TtsConfig {
    pub fn chunk_options(&self) -> ChunkOptions {
        ChunkOptions::new(self.target_size, self.hard_cap).clamped()
    }
}

/// USD per million input characters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    #[serde(default = "default_openai_price")]
    pub openai: f64,
    #[serde(default = "default_google_price")]
    pub google: f64,
    #[serde(default)]
    pub kokoro: f64,
}

fn default_openai_price() -> f64 {
    20.0
}

fn default_google_price() -> f64 {
    16.0
}

impl Default for PriceTable {
    fn default() -> Self {
        Self {
            openai: default_openai_price(),
            google: default_google_price(),
            kokoro: 0.0,
        }
    }
}

impl PriceTable {
    pub fn per_million(&self, provider: SpeechProviderKind) -> f64 {
        match provider {
            SpeechProviderKind::OpenAi => self.openai,
            SpeechProviderKind::Google => self.google,
            SpeechProviderKind::Kokoro => self.kokoro,
        }
    }
}
