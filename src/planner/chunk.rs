//! Size-bounded chunking over paragraphs and sentences.

use std::sync::OnceLock;

use regex::Regex;

use crate::planner::markdown::slugify_section;
use crate::planner::{char_len, ChunkOptions, Section, SectionInfo, TextChunk};

const PARAGRAPH_JOIN: &str = "\n\n";
const SENTENCE_JOIN: &str = " ";

fn paragraph_break() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{2,}").expect("paragraph pattern"))
}

fn sentence_end() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]\s+").expect("sentence pattern"))
}

fn split_paragraphs(text: &str) -> Vec<&str> {
    paragraph_break()
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Split on whitespace following `.`, `!` or `?`, keeping the punctuation.
fn split_sentences(paragraph: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0usize;
    for m in sentence_end().find_iter(paragraph) {
        // terminal punctuation is a single ASCII byte
        let end = m.start() + 1;
        let sentence = paragraph[start..end].trim();
        if !sentence.is_empty() {
            out.push(sentence);
        }
        start = m.end();
    }
    let tail = paragraph[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

/// Greedy packer: paragraphs accumulate up to the soft target; a paragraph that alone exceeds
/// the hard cap is broken at sentence boundaries.
fn pack_paragraphs(paragraphs: &[&str], opts: ChunkOptions, emit: &mut dyn FnMut(String)) {
    let mut buffer: Vec<&str> = Vec::new();
    let mut size = 0usize;

    for paragraph in paragraphs {
        let len = char_len(paragraph);
        let next = if buffer.is_empty() {
            len
        } else {
            size + PARAGRAPH_JOIN.len() + len
        };

        if next <= opts.target_size {
            buffer.push(paragraph);
            size = next;
            continue;
        }

        if !buffer.is_empty() {
            emit(buffer.join(PARAGRAPH_JOIN));
            buffer.clear();
            size = 0;
        }

        if len > opts.hard_cap {
            pack_sentences(paragraph, opts.hard_cap, emit);
        } else {
            buffer.push(paragraph);
            size = len;
        }
    }

    if !buffer.is_empty() {
        emit(buffer.join(PARAGRAPH_JOIN));
    }
}

fn pack_sentences(paragraph: &str, limit: usize, emit: &mut dyn FnMut(String)) {
    let mut buffer: Vec<&str> = Vec::new();
    let mut size = 0usize;
    for sentence in split_sentences(paragraph) {
        let len = char_len(sentence);
        let next = if buffer.is_empty() {
            len
        } else {
            size + SENTENCE_JOIN.len() + len
        };
        if next > limit && !buffer.is_empty() {
            emit(buffer.join(SENTENCE_JOIN));
            buffer.clear();
            size = len;
        } else {
            size = next;
        }
        buffer.push(sentence);
    }
    if !buffer.is_empty() {
        emit(buffer.join(SENTENCE_JOIN));
    }
}

/// Chunk sectioned text. The first chunk of a titled section carries its heading; a titled
/// section without body yields a heading-only chunk.
pub fn chunk_sections(sections: &[Section], opts: ChunkOptions, with_ids: bool) -> Vec<TextChunk> {
    let opts = opts.clamped();
    let mut chunks: Vec<TextChunk> = Vec::new();

    for section in sections {
        let heading = section
            .title
            .as_ref()
            .map(|title| format!("{} {}", "#".repeat(section.depth.max(1)), title));
        let info = SectionInfo {
            section_title: section.title.clone(),
            section_index: section.index,
            heading_depth: section.depth,
            section_id: with_ids.then(|| slugify_section(section.title.as_deref(), section.index)),
        };

        let paragraphs = split_paragraphs(&section.body);
        if paragraphs.is_empty() {
            if let Some(heading) = heading {
                chunks.push(TextChunk {
                    index: chunks.len(),
                    text: heading,
                    section: Some(info),
                });
            }
            continue;
        }

        let mut first = true;
        pack_paragraphs(&paragraphs, opts, &mut |text| {
            let text = match (&heading, first) {
                (Some(h), true) => format!("{h}{PARAGRAPH_JOIN}{text}"),
                _ => text,
            };
            first = false;
            chunks.push(TextChunk {
                index: chunks.len(),
                text,
                section: Some(info.clone()),
            });
        });
    }

    chunks
}

/// Chunk plain text by paragraphs with no section metadata.
pub fn chunk_paragraphs(text: &str, opts: ChunkOptions) -> Vec<TextChunk> {
    let opts = opts.clamped();
    let paragraphs = split_paragraphs(text);
    let mut chunks: Vec<TextChunk> = Vec::new();
    pack_paragraphs(&paragraphs, opts, &mut |text| {
        chunks.push(TextChunk {
            index: chunks.len(),
            text,
            section: None,
        });
    });
    chunks
}
