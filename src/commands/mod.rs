//! Command dispatch and handlers.

pub mod run;
pub mod summary;

use crate::cli::Command;
use crate::error::Error;

/// Dispatch a parsed command to its handler.
///
/// # Errors
///
/// Returns an error if the selected command handler fails.
pub async fn dispatch(command: &Command) -> Result<(), Error> {
    match command {
        Command::Run { env_file } => run::run(env_file.as_deref()).await,
        Command::Summary { report_dir } => summary::run(report_dir),
    }
}
