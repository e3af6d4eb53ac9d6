//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI parser for `tapedeck`.
#[derive(Debug, Parser)]
#[command(name = "tapedeck", version, about = "Record, replay and compare HTTP traffic")]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the mode configured by the TAPEDECK_* environment variables.
    Run {
        /// Load variables from this file instead of `.env`.
        #[arg(long, value_name = "PATH")]
        env_file: Option<PathBuf>,
    },
    /// Print the summary of a finished run.
    Summary {
        /// Report directory holding the run's metadata.json.
        report_dir: PathBuf,
    },
}
