//! Deterministic fingerprints for content and generation parameters.
//!
//! Every hash in the pipeline goes through [`stable_hash`]: each part is fed to blake3 followed
//! by a NUL byte so that `["ab", "c"]` and `["a", "bc"]` never collide.

use blake3::Hasher;

use crate::types::{Fingerprint, JobKey, JobKind};

/// Engine version tag mixed into every unit hash. Bumping it invalidates cached outputs.
pub const ENGINE_VERSION: &str = "md-v1";

/// Parameters that influence generated output.
///
/// Implementors return every field that changes the bytes a provider would produce, in a
/// fixed order. Absent optional values must still contribute a placeholder.
pub trait FingerprintParams {
    fn fingerprint_parts(&self) -> Vec<String>;
}

/// Hash a sequence of string parts into a hex digest.
pub fn stable_hash<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hasher = Hasher::new();
    for part in parts {
        hasher.update(part.as_ref().as_bytes());
        hasher.update(b"\0");
    }
    hasher.finalize().to_hex().to_string()
}

/// Digest of raw entity content, recorded on the entity when its content is written.
pub fn content_digest(content: &str) -> String {
    stable_hash(["content", content])
}

/// Version fingerprint from an already-computed content digest.
pub fn fingerprint_from_digest(digest: &str, params: &dyn FingerprintParams) -> Fingerprint {
    let mut parts = vec!["version".to_string(), digest.to_string()];
    parts.extend(params.fingerprint_parts());
    Fingerprint::from_hex(stable_hash(parts))
}

pub fn fingerprint(content: &str, params: &dyn FingerprintParams) -> Fingerprint {
    fingerprint_from_digest(&content_digest(content), params)
}

pub fn is_stale(job_version: &Fingerprint, current: &Fingerprint) -> bool {
    job_version != current
}

/// Content-addressed job key. Identical requests collapse onto the same key.
pub fn job_key(
    kind: JobKind,
    entity_id: &str,
    version: &Fingerprint,
    params: &dyn FingerprintParams,
) -> JobKey {
    let mut parts = vec![
        "job".to_string(),
        kind.as_str().to_string(),
        entity_id.to_string(),
        version.as_str().to_string(),
    ];
    parts.extend(params.fingerprint_parts());
    JobKey::new(stable_hash(parts))
}

/// Format an optional value so that `None` still occupies its slot in the hash.
pub fn opt_part<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
