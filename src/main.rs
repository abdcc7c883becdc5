//! Main entry point for the zipfresh CLI application.
//!
//! Parses the command line, runs either a listing or a synchronization, and
//! turns the outcome into an exit status: 0 on success, 1 on archive, source
//! or extraction failures, 2 on usage errors.

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use zipfresh::{Cli, ExtractionDecision, SyncError, list_archive, synchronize_with};

const USAGE_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Diagnostics go to stderr, filtered by `RUST_LOG` (default: warnings only).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: &Cli) -> Result<ExitCode> {
    let config = match cli.to_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(ExitCode::from(USAGE_ERROR));
        }
    };

    // List mode: display archive contents and exit
    if cli.list {
        let table = list_archive(&config.archive)
            .await
            .with_context(|| config.archive.display().to_string())?;
        print!("{table}");
        return Ok(ExitCode::SUCCESS);
    }

    let quiet = config.quiet;
    let progress = |decision: &ExtractionDecision| {
        if !quiet {
            println!("  extracting: {}", decision.destination.display());
        }
    };

    let outcome = match synchronize_with(&config, progress).await {
        Ok(outcome) => outcome,
        Err(SyncError::NoValidSources { errors }) => {
            for e in &errors {
                eprintln!("{e}");
            }
            eprintln!("error: no valid files found");
            return Ok(ExitCode::FAILURE);
        }
        Err(e @ SyncError::Archive(_)) => {
            return Err(e).with_context(|| config.archive.display().to_string());
        }
        Err(e) => return Err(e.into()),
    };

    for e in &outcome.source_errors {
        eprintln!("{e}");
    }
    for failure in &outcome.report.failures {
        eprintln!("error: {failure}");
    }

    if !config.quiet {
        println!("{}", outcome.report.summary());
    }

    if outcome.report.failures.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
