//! Determinism of content hashes, fingerprints and job keys

use lexicast::fingerprint::stable_hash;
use lexicast::job::{JobContent, JobParams, JobRequest};
use lexicast::planner::ChunkOptions;
use lexicast::tts::{plan_document, TtsParams};
use proptest::prelude::*;

fn markdown(text: &str) -> JobContent {
    JobContent::Markdown {
        markdown: text.to_string(),
    }
}

/// Hashing is stable across calls and part boundaries matter
#[test]
fn test_stable_hash_part_boundaries() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&("[a-zA-Z0-9 ]{2,40}", 1usize..40, 1usize..40), |(text, i, j)| {
            let i = i % text.len();
            let j = j % text.len();
            prop_assume!(i != j);

            let (a, b) = text.split_at(i);
            let (c, d) = text.split_at(j);
            assert_eq!(stable_hash([a, b]), stable_hash([a, b]));
            assert_ne!(stable_hash([a, b]), stable_hash([c, d]));
            Ok(())
        })
        .unwrap();
}

/// The same request always lands on the same job key
#[test]
fn test_job_key_determinism() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(".{0,200}", "[a-z0-9-]{1,20}"), |(content, entity)| {
            let first = JobRequest::new(
                entity.as_str(),
                markdown(&content),
                JobParams::Tts(TtsParams::default()),
                None,
            )
            .unwrap();
            let second = JobRequest::new(
                entity.as_str(),
                markdown(&content),
                JobParams::Tts(TtsParams::default()),
                Some("Another title".to_string()),
            )
            .unwrap();
            assert_eq!(first.key, second.key);
            assert_eq!(first.version, second.version);
            Ok(())
        })
        .unwrap();
}

proptest! {
    #[test]
    fn edited_content_changes_the_version(content in "[a-z ]{1,200}", suffix in "[a-z]{1,10}") {
        let params = JobParams::Tts(TtsParams::default());
        let before = JobRequest::new("doc", markdown(&content), params.clone(), None).unwrap();
        let edited = format!("{content}{suffix}");
        let after = JobRequest::new("doc", markdown(&edited), params, None).unwrap();
        prop_assert_ne!(before.version, after.version);
        prop_assert_ne!(before.key, after.key);
    }

    #[test]
    fn planning_is_deterministic(words in prop::collection::vec("[a-z]{1,10}", 1..400)) {
        let text = words.join(" ");
        let resolved = TtsParams::default().resolve(false);
        let first = plan_document(&text, ChunkOptions::default(), &resolved);
        let second = plan_document(&text, ChunkOptions::default(), &resolved);
        let first: Vec<&str> = first.iter().map(|u| u.content_hash.as_str()).collect();
        let second: Vec<&str> = second.iter().map(|u| u.content_hash.as_str()).collect();
        prop_assert_eq!(first, second);
    }
}
