//! Configuration files and the CLI run context

use std::fs;

use clap::Parser;
use lexicast::cli::{Cli, RunContext};
use lexicast::config::{ConfigLoader, LexicastConfig, ObjectStoreConfig};
use lexicast::Lexicast;
use tempfile::TempDir;

fn write_config(dir: &TempDir, extra: &str) -> std::path::PathBuf {
    let path = dir.path().join("lexicast.toml");
    let body = format!(
        r#"
[storage]
data_dir = "{}"

[storage.objects]
type = "memory"

{extra}
"#,
        dir.path().join("db").display()
    );
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn config_file_overrides_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[tts]
target_size = 900

[providers.narrator]
type = "kokoro"
url = "http://localhost:8880"
"#,
    );

    let config = ConfigLoader::load_from_file(&path).unwrap();
    assert_eq!(config.tts.target_size, 900);
    assert_eq!(config.tts.batch_size, 4);
    assert!(matches!(config.storage.objects, ObjectStoreConfig::Memory { .. }));
    assert_eq!(config.providers.len(), 1);
    assert!(config.validate().is_ok());
}

#[test]
fn invalid_provider_config_is_rejected_on_open() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[providers.narrator]
type = "kokoro"
url = "localhost:8880"
"#,
    );

    let config: LexicastConfig = ConfigLoader::load_from_file(&path).unwrap();
    let err = Lexicast::open(&config).err().unwrap();
    assert!(err.to_string().contains("narrator"));
}

#[test]
fn cli_reports_jobs_and_failures() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "");
    let doc = dir.path().join("notes.md");
    fs::write(&doc, "# Notes\n\nA short document.").unwrap();

    let config = RunContext::load_config(dir.path(), Some(&path)).unwrap();
    let context = RunContext::new(&config).unwrap();

    let jobs = Cli::try_parse_from(["lexicast", "jobs"]).unwrap();
    assert_eq!(context.execute(&jobs.command).unwrap(), "No jobs.");

    // no speech provider is configured, so the job fails permanently
    let narrate = Cli::try_parse_from([
        "lexicast",
        "tts-document",
        "--entity",
        "doc-1",
        "--format",
        "json",
        doc.to_str().unwrap(),
    ])
    .unwrap();
    let output = context.execute(&narrate.command).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed["result"]["outcome"], "failed");
    assert_eq!(parsed["result"]["retryable"], false);

    let key = parsed["job_key"].as_str().unwrap().to_string();
    let status = Cli::try_parse_from(["lexicast", "status", "--format", "json", key.as_str()]).unwrap();
    let output = context.execute(&status.command).unwrap();
    let view: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(view["status"], "error");
    assert_eq!(view["kind"], "document_tts");
}
