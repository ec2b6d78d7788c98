//! `roundtable`: multi-model conversations over an archive.
//!
//! Configuration comes from `roundtable.toml` and the environment (see
//! `config.rs`). Logging: `RUST_LOG` (default `info`), written to stderr.

mod bootstrap;
mod cli;
mod commands;
mod config;
mod error;

use crate::bootstrap::Bootstrap;
use crate::cli::{Cli, Command};
use crate::error::CliError;
use clap::Parser;
use rootcause::prelude::Report;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            eprintln!("Error: {report}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Report<CliError>> {
    let boot = Bootstrap::init().await?;
    let identity = boot.identity();
    tracing::debug!(
        chain = %identity.chain,
        namespace = %identity.namespace,
        author = %identity.author,
        "storage identity"
    );

    match cli.command {
        Command::Converse {
            topic,
            rounds,
            models,
        } => commands::converse(&boot, topic, rounds, models).await,
        Command::Ask { prompt, model } => commands::ask(&boot, prompt, model).await,
        Command::Remember {
            prompt,
            memory,
            model,
            summarizer,
        } => commands::remember(&boot, prompt, memory, model, summarizer).await,
        Command::Watch { model, gateway } => commands::watch(&boot, model, gateway).await,
        Command::Files { action } => commands::files(&boot, action).await,
    }
}
