//! Planning: splitting source content into ordered, addressable units.
//!
//! Planning is pure. The same content and parameters always produce the same units with the
//! same content hashes, which is what lets the step executor treat object storage as a cache.

pub mod chunk;
pub mod html;
pub mod markdown;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

pub use chunk::{chunk_paragraphs, chunk_sections};
pub use markdown::{sanitize_markdown, slugify_section, split_markdown_sections};

/// Lower and upper clamp for the soft chunk target (characters)
pub const MIN_TARGET_SIZE: usize = 200;
pub const MAX_TARGET_SIZE: usize = 2000;
pub const DEFAULT_TARGET_SIZE: usize = 1400;
pub const DEFAULT_HARD_CAP: usize = 4000;

/// One unit of work with its cache key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedUnit<P> {
    /// Position in the final manifest
    pub index: usize,
    /// Hash of normalized content plus every generation parameter
    pub content_hash: String,
    pub payload: P,
}

/// Chunk sizing policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkOptions {
    pub target_size: usize,
    pub hard_cap: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            target_size: DEFAULT_TARGET_SIZE,
            hard_cap: DEFAULT_HARD_CAP,
        }
    }
}

impl ChunkOptions {
    pub fn new(target_size: usize, hard_cap: usize) -> Self {
        Self {
            target_size,
            hard_cap,
        }
    }

    /// Clamp the target into range and make sure the hard cap is at least the target.
    pub fn clamped(self) -> Self {
        let target_size = self.target_size.clamp(MIN_TARGET_SIZE, MAX_TARGET_SIZE);
        Self {
            target_size,
            hard_cap: self.hard_cap.max(target_size),
        }
    }
}

/// A titled (or untitled) region of source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: Option<String>,
    /// Heading depth 1-6, or 0 for untitled content
    pub depth: usize,
    pub index: usize,
    pub body: String,
}

/// Section metadata carried on chunks and into the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_title: Option<String>,
    pub section_index: usize,
    pub heading_depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
}

/// Text chunk before hashing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub index: usize,
    pub text: String,
    pub section: Option<SectionInfo>,
}

/// Normalization applied before hashing: NFKC, whitespace collapsed, trimmed.
pub fn normalize_for_hash(text: &str) -> String {
    let composed: String = text.nfkc().collect();
    composed.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}
