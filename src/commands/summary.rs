//! `tapedeck summary` command.

use std::path::Path;

use crate::error::Error;
use crate::report::{RunMetadata, METADATA_FILE};

/// Execute the `summary` command.
///
/// Prints the summary of the run whose metadata lives in `report_dir`.
///
/// # Errors
///
/// Returns an error if the metadata file is missing or unreadable.
pub fn run(report_dir: &Path) -> Result<(), Error> {
    let metadata = load(report_dir)?;
    println!("{}", metadata.summary_text(report_dir));
    Ok(())
}

/// Reads the metadata of the run recorded in `report_dir`.
///
/// # Errors
///
/// Returns an error if the metadata file is missing or is not valid JSON.
pub fn load(report_dir: &Path) -> Result<RunMetadata, Error> {
    let path = report_dir.join(METADATA_FILE);
    let content = std::fs::read(&path)
        .map_err(|e| Error::Metadata { path: path.clone(), message: e.to_string() })?;
    serde_json::from_slice(&content).map_err(|e| Error::Metadata { path, message: e.to_string() })
}
