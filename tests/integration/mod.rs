//! Integration tests for the lexicast pipeline

mod cli_config;
mod document_pipeline;
mod failure_handling;
mod job_queue;
mod resume;
mod support;
mod thumbnail_pipeline;
