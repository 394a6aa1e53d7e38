//! Lexicast CLI Binary
//!
//! Command-line interface for narrating documents and rendering thumbnails.

use anyhow::Context;
use clap::Parser;
use lexicast::cli::{Cli, RunContext};
use lexicast::config::LexicastConfig;
use lexicast::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info};

fn main() {
    if let Err(e) = run() {
        error!("Command failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = RunContext::load_config(&cli.workspace, cli.config.as_deref())
        .context("Failed to load configuration")?;

    let logging_config = build_logging_config(&cli, &config);
    init_logging(Some(&logging_config)).context("Failed to initialize logging")?;
    info!("Lexicast CLI starting");

    let context = RunContext::new(&config).context("Failed to initialize lexicast")?;
    let output = context.execute(&cli.command)?;
    info!("Command completed successfully");
    println!("{}", output);
    Ok(())
}

/// Build logging configuration from CLI args and the config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli, config: &LexicastConfig) -> LoggingConfig {
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        logging.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        logging.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        logging.output = output.clone();
    }
    logging
}
