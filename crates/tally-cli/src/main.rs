//! Tally CLI - Recurring payment detector
//!
//! Usage:
//!   tally detect --file CSV         Find subscriptions in a transaction file
//!   tally detect --file CSV --ai    Ask the configured AI backend first
//!   tally normalize "NETFLIX.COM"   Show merchant grouping keys
//!   tally serve --port 3000         Start the REST server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tally_core::TallyConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Detect { file, ai, json } => {
            let config = load_config(config_path)?;
            commands::cmd_detect(&config, &file, ai, json).await
        }
        Commands::Normalize { merchants } => commands::cmd_normalize(&merchants),
        Commands::AiCheck => commands::cmd_ai_check(&load_config(config_path)?).await,
        Commands::Config => commands::cmd_config_show(&load_config(config_path)?, config_path),
        Commands::Prompts { action } => match action {
            None | Some(PromptsAction::List) => commands::cmd_prompts_list(),
            Some(PromptsAction::Show { prompt_id }) => commands::cmd_prompts_show(&prompt_id),
            Some(PromptsAction::Path) => commands::cmd_prompts_path(),
        },
        Commands::Serve { port, host } => {
            commands::cmd_serve(load_config(config_path)?, &host, port).await
        }
    }
}

/// Config file, then environment overrides
fn load_config(path: Option<&Path>) -> Result<TallyConfig> {
    TallyConfig::resolve(path).context("Failed to load configuration")
}
