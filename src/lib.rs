//! Lexicast: Durable Narration & Thumbnail Pipeline
//!
//! Turns documents and articles into cached, chunked speech and renders visual entities into
//! themed thumbnails. Every unit of output lives under a content-addressed key, every job step
//! is checkpointed, and jobs are abandoned as soon as their source content changes.

pub mod api;
pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod fingerprint;
pub mod job;
pub mod logging;
pub mod pipeline;
pub mod planner;
pub mod provider;
pub mod retry;
pub mod storage;
pub mod thumbnail;
pub mod tts;
pub mod types;
pub mod workflow;

pub use api::{JobRun, Lexicast};
pub use error::{ErrorClass, PipelineError, StorageError};
