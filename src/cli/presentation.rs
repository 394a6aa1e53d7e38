//! CLI presentation: text tables and JSON for job results.

use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::json;

use crate::api::JobRun;
use crate::cli::parse::OutputFormat;
use crate::error::PipelineError;
use crate::job::{JobStatus, JobStatusView};
use crate::pipeline::JobOutcome;
use crate::types::JobKey;

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, PipelineError> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn format_timestamp(ms: u64) -> String {
    chrono::DateTime::from_timestamp_millis(ms as i64)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn colored_status(status: JobStatus) -> String {
    match status {
        JobStatus::Ready => status.as_str().green().to_string(),
        JobStatus::Error => status.as_str().red().to_string(),
        JobStatus::Stale => status.as_str().yellow().to_string(),
        JobStatus::Processing => status.as_str().cyan().to_string(),
        JobStatus::Queued => status.as_str().dimmed().to_string(),
    }
}

fn outcome_label(outcome: &JobOutcome) -> String {
    match outcome {
        JobOutcome::Ready(_) => "ready".green().to_string(),
        JobOutcome::Duplicate { .. } => "ready (cached)".green().to_string(),
        JobOutcome::Stale { .. } => "stale".yellow().to_string(),
        JobOutcome::Failed { retryable: true, .. } => "error (will retry)".red().to_string(),
        JobOutcome::Failed { .. } => "failed".red().to_string(),
    }
}

fn outcome_detail(outcome: &JobOutcome) -> String {
    match outcome {
        JobOutcome::Ready(done) => done.manifest_ref.clone(),
        JobOutcome::Duplicate { manifest_ref } => manifest_ref.clone().unwrap_or_else(|| "-".to_string()),
        JobOutcome::Stale { reason } => reason.clone(),
        JobOutcome::Failed { message, .. } => message.clone(),
    }
}

pub fn format_outcome(
    key: &JobKey,
    outcome: &JobOutcome,
    format: OutputFormat,
) -> Result<String, PipelineError> {
    if format == OutputFormat::Json {
        return to_json(&json!({ "job_key": key, "result": outcome }));
    }
    let mut lines = vec![
        format!("{} {}", "Job".bold(), key),
        format!("Status:   {}", outcome_label(outcome)),
    ];
    match outcome {
        JobOutcome::Ready(done) => {
            lines.push(format!("Manifest: {}", done.manifest_ref));
            lines.push(format!("Units:    {}", done.unit_count));
            if done.total_chars > 0 {
                lines.push(format!("Chars:    {}", done.total_chars));
            }
            for (variant, url) in &done.variants {
                lines.push(format!("{:<9} {}", format!("{variant}:"), url));
            }
        }
        other => lines.push(format!("Detail:   {}", outcome_detail(other))),
    }
    Ok(lines.join("\n"))
}

pub fn format_job_status(view: &JobStatusView, format: OutputFormat) -> Result<String, PipelineError> {
    if format == OutputFormat::Json {
        return to_json(view);
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.add_row(vec!["Key".to_string(), view.key.to_string()]);
    table.add_row(vec!["Kind".to_string(), view.kind.to_string()]);
    table.add_row(vec!["Status".to_string(), colored_status(view.status)]);
    table.add_row(vec![
        "Progress".to_string(),
        format!(
            "{}/{} ({:.0}%)",
            view.completed_count,
            view.planned_count,
            view.progress() * 100.0
        ),
    ]);
    table.add_row(vec!["Attempts".to_string(), view.attempts.to_string()]);
    table.add_row(vec!["Updated".to_string(), format_timestamp(view.updated_at_ms)]);
    if let Some(manifest) = &view.manifest_ref {
        table.add_row(vec!["Manifest".to_string(), manifest.clone()]);
    }
    if let Some(stitched) = &view.stitched_ref {
        table.add_row(vec!["Stitched".to_string(), stitched.clone()]);
    }
    if let Some(error) = &view.last_error {
        table.add_row(vec!["Last error".to_string(), error.clone()]);
    }
    Ok(table.to_string())
}

pub fn format_job_table(views: &[JobStatusView], format: OutputFormat) -> Result<String, PipelineError> {
    if format == OutputFormat::Json {
        return to_json(&views);
    }
    if views.is_empty() {
        return Ok("No jobs.".to_string());
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Key", "Kind", "Status", "Progress", "Attempts", "Updated"]);
    for view in views {
        let key = view.key.as_str();
        table.add_row(vec![
            key.get(..12).unwrap_or(key).to_string(),
            view.kind.to_string(),
            colored_status(view.status),
            format!("{}/{}", view.completed_count, view.planned_count),
            view.attempts.to_string(),
            format_timestamp(view.updated_at_ms),
        ]);
    }
    Ok(table.to_string())
}

pub fn format_runs(title: &str, runs: &[JobRun], format: OutputFormat) -> Result<String, PipelineError> {
    if format == OutputFormat::Json {
        let rows: Vec<_> = runs
            .iter()
            .map(|run| json!({ "job_key": run.key, "result": run.outcome }))
            .collect();
        return to_json(&rows);
    }
    if runs.is_empty() {
        return Ok(format!("{}: nothing to do.", title));
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Key", "Result", "Detail"]);
    for run in runs {
        let key = run.key.as_str();
        table.add_row(vec![
            key.get(..12).unwrap_or(key).to_string(),
            outcome_label(&run.outcome),
            outcome_detail(&run.outcome),
        ]);
    }
    Ok(format!("{}\n{}", title.bold().underline(), table))
}
