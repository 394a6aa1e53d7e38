//! CLI domain: parse, route, and presentation only.
//! No domain orchestration; the route table dispatches to the `Lexicast` facade.

mod parse;
mod presentation;
mod route;

pub use parse::{Cli, Commands, OutputFormat, TtsOptions};
pub use presentation::{format_job_status, format_job_table, format_outcome, format_runs};
pub use route::RunContext;
