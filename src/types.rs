//! Identifier types shared across the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Content-addressed job key: one job per (kind, entity, version, parameters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobKey(String);

impl JobKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hex digest of an entity's content combined with generation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The three pipelines built on the shared step engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    DocumentTts,
    ArticleTts,
    Thumbnail,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::DocumentTts => "document_tts",
            JobKind::ArticleTts => "article_tts",
            JobKind::Thumbnail => "thumbnail",
        }
    }

    /// Object-store prefix under which manifests for this kind live.
    pub fn manifest_prefix(self) -> &'static str {
        match self {
            JobKind::DocumentTts => "tts/doc",
            JobKind::ArticleTts => "tts/article",
            JobKind::Thumbnail => "thumbnails",
        }
    }

    /// Key in the owning entity's state where results are merged.
    pub fn entity_slot(self) -> &'static str {
        match self {
            JobKind::DocumentTts => "tts_document",
            JobKind::ArticleTts => "tts_article",
            JobKind::Thumbnail => "thumbnail",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
