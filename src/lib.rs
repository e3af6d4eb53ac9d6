//! Core library entry for the `tapedeck` HTTP traffic simulator.
//!
//! A run forwards traffic to a real target while recording it into a
//! cassette, replays a cassette against the target with its original
//! pacing, or compares live traffic against the cassette and reports where
//! they diverge.

pub mod adapters;
pub mod cassette;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod matching;
pub mod mode;
pub mod model;
pub mod ports;
pub mod report;
pub mod server;
pub mod timing;

mod persist;

use clap::Parser;

pub use error::Error;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error when argument parsing fails or command execution fails.
pub async fn run<I, T>(args: I) -> Result<(), Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = cli::Cli::try_parse_from(args)?;
    commands::dispatch(&cli.command).await
}
