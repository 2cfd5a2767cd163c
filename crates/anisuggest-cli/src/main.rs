//! anisuggest CLI - Cached, ranked search suggestions in the terminal
//!
//! This is the main entry point for the anisuggest command-line interface.
//! Command implementations live in separate modules.

use anisuggest_core::Config;
use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;

mod cli;
mod commands;
mod output;
mod utils;

use cli::{Cli, Commands, join_text};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    utils::initialize_logging(&cli)?;

    let config = load_config(&cli)?;
    execute_command(cli, &config).await
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Config::load().context("Failed to load config"),
    }
}

async fn execute_command(cli: Cli, config: &Config) -> Result<()> {
    match cli.command {
        Commands::Suggest { text, format } => {
            commands::suggest(config, &join_text(&text), format.format()).await
        },
        Commands::Type {
            text,
            interval_ms,
            format,
        } => {
            commands::type_text(
                config,
                &join_text(&text),
                Duration::from_millis(interval_ms),
                format.format(),
            )
            .await
        },
        Commands::Open { text } => commands::open_url(config, &join_text(&text)),
        Commands::Cache { action } => commands::manage_cache(config, action).await,
    }
}
