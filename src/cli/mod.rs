//! Command-line surface for the `turn-engine` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// A five-phase saga-backed turn orchestrator.
#[derive(Debug, Parser)]
#[command(name = "turn-engine", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Emit machine-readable JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP server and serve turns until shut down.
    Serve {
        /// Override the configured bind address (host:port).
        #[arg(long)]
        bind: Option<String>,
    },
    /// Run a single turn to completion and print the result, without
    /// starting the HTTP server.
    Run {
        /// Participant identifiers for the turn (repeat the flag per participant).
        #[arg(long = "participant", required = true)]
        participants: Vec<String>,
    },
    /// Load and validate a configuration file, then exit.
    ValidateConfig {
        /// Path to the YAML configuration file to validate.
        path: PathBuf,
    },
}
