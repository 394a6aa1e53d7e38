//! Job requests: what to generate, for which entity, at which version.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::fingerprint::{fingerprint, job_key, FingerprintParams};
use crate::thumbnail::params::ThumbnailParams;
use crate::tts::params::TtsParams;
use crate::types::{now_millis, Fingerprint, JobKey, JobKind};

/// Source content as submitted with a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobContent {
    /// A markdown document
    Markdown { markdown: String },
    /// An article as plain text with optional HTML
    Article {
        plain_text: String,
        #[serde(default)]
        html: Option<String>,
    },
    /// The serialized state of a visual entity, rendered rather than read
    Entity { content: String },
}

impl JobContent {
    /// The string stored on the owning entity and fingerprinted for staleness checks.
    ///
    /// Articles are identified by their HTML when present, otherwise by their plain text.
    pub fn entity_content(&self) -> &str {
        match self {
            JobContent::Markdown { markdown } => markdown,
            JobContent::Article {
                html: Some(html), ..
            } => html,
            JobContent::Article { plain_text, .. } => plain_text,
            JobContent::Entity { content } => content,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pipeline", rename_all = "snake_case")]
pub enum JobParams {
    Tts(TtsParams),
    Thumbnail(ThumbnailParams),
}

impl FingerprintParams for JobParams {
    fn fingerprint_parts(&self) -> Vec<String> {
        match self {
            JobParams::Tts(params) => params.fingerprint_parts(),
            JobParams::Thumbnail(params) => params.fingerprint_parts(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    pub key: JobKey,
    pub kind: JobKind,
    pub entity_id: String,
    pub version: Fingerprint,
    pub content: JobContent,
    pub params: JobParams,
    #[serde(default)]
    pub title: Option<String>,
    pub requested_at_ms: u64,
}

impl JobRequest {
    /// Build a request, deriving its kind, version fingerprint and key.
    pub fn new(
        entity_id: impl Into<String>,
        content: JobContent,
        params: JobParams,
        title: Option<String>,
    ) -> Result<Self, PipelineError> {
        let kind = match (&content, &params) {
            (JobContent::Markdown { .. }, JobParams::Tts(_)) => JobKind::DocumentTts,
            (JobContent::Article { .. }, JobParams::Tts(_)) => JobKind::ArticleTts,
            (JobContent::Entity { .. }, JobParams::Thumbnail(_)) => JobKind::Thumbnail,
            _ => {
                return Err(PipelineError::ConfigError(
                    "content type does not match the requested pipeline".to_string(),
                ))
            }
        };
        let entity_id = entity_id.into();
        if entity_id.trim().is_empty() {
            return Err(PipelineError::ConfigError(
                "entity id must not be empty".to_string(),
            ));
        }
        let version = fingerprint(content.entity_content(), &params);
        let key = job_key(kind, &entity_id, &version, &params);
        Ok(Self {
            key,
            kind,
            entity_id,
            version,
            content,
            params,
            title,
            requested_at_ms: now_millis(),
        })
    }
}
