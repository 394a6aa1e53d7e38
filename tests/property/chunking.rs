//! Chunk size bounds and text preservation

use lexicast::planner::{chunk_paragraphs, ChunkOptions};
use proptest::prelude::*;

fn sentence() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z]{1,8}", 1..15).prop_map(|words| format!("{}.", words.join(" ")))
}

fn paragraph() -> impl Strategy<Value = String> {
    prop::collection::vec(sentence(), 1..40).prop_map(|sentences| sentences.join(" "))
}

fn document() -> impl Strategy<Value = String> {
    prop::collection::vec(paragraph(), 1..12).prop_map(|paragraphs| paragraphs.join("\n\n"))
}

fn options() -> impl Strategy<Value = ChunkOptions> {
    (200usize..2000, 0usize..2000).prop_map(|(target, extra)| ChunkOptions::new(target, target + extra))
}

proptest! {
    #[test]
    fn chunks_never_exceed_the_hard_cap(text in document(), opts in options()) {
        let cap = opts.clamped().hard_cap;
        let chunks = chunk_paragraphs(&text, opts);
        prop_assert!(!chunks.is_empty());
        for chunk in &chunks {
            prop_assert!(chunk.text.chars().count() <= cap);
        }
    }

    #[test]
    fn chunking_keeps_every_word_in_order(text in document(), opts in options()) {
        let chunks = chunk_paragraphs(&text, opts);
        let original: Vec<&str> = text.split_whitespace().collect();
        let rejoined: Vec<&str> = chunks
            .iter()
            .flat_map(|chunk| chunk.text.split_whitespace())
            .collect();
        prop_assert_eq!(original, rejoined);
    }

    #[test]
    fn chunk_indices_are_contiguous(text in document(), opts in options()) {
        let chunks = chunk_paragraphs(&text, opts);
        for (i, chunk) in chunks.iter().enumerate() {
            prop_assert_eq!(chunk.index, i);
        }
    }
}
