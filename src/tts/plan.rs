//! Narration planning: content to ordered, hashed speech chunks.

use serde::{Deserialize, Serialize};

use crate::fingerprint::{stable_hash, ENGINE_VERSION};
use crate::pipeline::UnitPayload;
use crate::planner::html::split_html_sections;
use crate::planner::{
    chunk_paragraphs, chunk_sections, normalize_for_hash, sanitize_markdown,
    split_markdown_sections, ChunkOptions, PlannedUnit, SectionInfo, TextChunk,
};
use crate::tts::params::ResolvedTts;

/// Text of one synthesis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechChunk {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<SectionInfo>,
}

impl UnitPayload for SpeechChunk {
    fn source_text(&self) -> Option<&str> {
        Some(&self.text)
    }

    fn section(&self) -> Option<&SectionInfo> {
        self.section.as_ref()
    }
}

/// Cache key for a chunk: normalized text, every voice parameter and the engine version.
pub fn chunk_hash(text: &str, resolved: &ResolvedTts) -> String {
    let mut parts = vec![normalize_for_hash(text)];
    parts.extend(resolved.unit_hash_parts());
    parts.push(ENGINE_VERSION.to_string());
    stable_hash(parts)
}

fn into_units(chunks: Vec<TextChunk>, resolved: &ResolvedTts) -> Vec<PlannedUnit<SpeechChunk>> {
    chunks
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| PlannedUnit {
            index,
            content_hash: chunk_hash(&chunk.text, resolved),
            payload: SpeechChunk {
                text: chunk.text,
                section: chunk.section,
            },
        })
        .collect()
}

/// Sanitize markdown, split by headings, and chunk each section.
pub fn plan_document(
    markdown: &str,
    opts: ChunkOptions,
    resolved: &ResolvedTts,
) -> Vec<PlannedUnit<SpeechChunk>> {
    let sanitized = sanitize_markdown(markdown);
    let sections = split_markdown_sections(&sanitized);
    into_units(chunk_sections(&sections, opts.clamped(), true), resolved)
}

/// Chunk an article by its HTML headings when it has any, otherwise by paragraphs of the
/// plain text.
pub fn plan_article(
    plain_text: &str,
    html: Option<&str>,
    opts: ChunkOptions,
    resolved: &ResolvedTts,
) -> Vec<PlannedUnit<SpeechChunk>> {
    let opts = opts.clamped();
    let sections = html.map(split_html_sections).unwrap_or_default();
    let chunks = if sections.is_empty() {
        chunk_paragraphs(plain_text, opts)
    } else {
        chunk_sections(&sections, opts, false)
    };
    into_units(chunks, resolved)
}

/// Estimated USD cost of synthesizing every unit.
pub fn estimate_cost(units: &[PlannedUnit<SpeechChunk>], price_per_million: f64) -> f64 {
    let chars: usize = units.iter().map(|u| u.payload.text.chars().count()).sum();
    chars as f64 / 1_000_000.0 * price_per_million
}
