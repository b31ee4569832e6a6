//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - Find the subscriptions hiding in your bank history
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Recurring payment detector", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to the platform data directory)
    ///
    /// Environment variables such as AI_BACKEND and OLLAMA_HOST override
    /// values from the file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Detect recurring charges in a transaction file
    Detect {
        /// CSV or JSON transaction file
        #[arg(short, long)]
        file: PathBuf,

        /// Ask the configured AI backend first, falling back to statistics
        #[arg(long)]
        ai: bool,

        /// Print candidates as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show the grouping key for merchant names
    Normalize {
        /// Merchant names as they appear on statements
        #[arg(required = true)]
        merchants: Vec<String>,
    },

    /// Check the configured AI backend
    AiCheck,

    /// Show the effective configuration
    Config,

    /// Manage AI prompts (list available prompts, view override status)
    Prompts {
        #[command(subcommand)]
        action: Option<PromptsAction>,
    },

    /// Start the REST server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// List all available prompts and their override status
    List,

    /// Show the content of a specific prompt
    Show {
        /// Prompt ID (e.g., detect_subscriptions)
        prompt_id: String,
    },

    /// Show the path where prompt overrides should be placed
    Path,
}
