//! Error types for configuration, cassettes, upstream calls and reports.

use std::path::PathBuf;

use thiserror::Error;

use crate::cassette::RecordMode;

/// Errors raised while reading configuration. Always fatal at start-up.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("you should set the '{0}' environment variable")]
    Missing(&'static str),
    /// A variable is set to a value that cannot be used.
    #[error("invalid value for {key}: {message}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// What is wrong with the value.
        message: String,
    },
    /// A match criterion name is not one of the known criteria.
    #[error("unknown {kind} match criterion '{name}', expected one of [{expected}]")]
    UnknownCriterion {
        /// `request` or `response`.
        kind: &'static str,
        /// The offending name.
        name: String,
        /// Comma separated list of valid names.
        expected: String,
    },
    /// The record mode is carried by configuration but not implemented.
    #[error("record mode '{0}' is not supported")]
    UnsupportedRecordMode(RecordMode),
}

/// Errors raised while building a request record from a URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The URL has no host component.
    #[error("url {0} has no host")]
    MissingHost(String),
    /// The URL has no explicit port and its scheme has no default.
    #[error("url {0} has no port")]
    MissingPort(String),
    /// The URL could not be parsed.
    #[error("invalid url {url}: {message}")]
    InvalidUrl {
        /// The URL as stored.
        url: String,
        /// Parser message.
        message: String,
    },
}

/// Errors raised while loading, mutating or persisting a cassette.
#[derive(Debug, Error)]
pub enum CassetteError {
    /// No file exists at the cassette path.
    #[error("cassette {} does not exist", .0.display())]
    Missing(PathBuf),
    /// The file exists but could not be read.
    #[error("failed to read cassette {}: {source}", path.display())]
    Read {
        /// Cassette path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not a valid cassette document.
    #[error("failed to parse cassette {}: {source}", path.display())]
    Parse {
        /// Cassette path.
        path: PathBuf,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },
    /// The cassette holds no interactions and cannot answer anything.
    #[error("cassette {} contains no interactions", .0.display())]
    Empty(PathBuf),
    /// A stored interaction could not be turned into a request record.
    #[error("interaction #{index} is invalid: {source}")]
    InvalidInteraction {
        /// Zero-based position in the cassette.
        index: usize,
        /// What is wrong with it.
        source: RecordError,
    },
    /// Serializing the cassette failed.
    #[error("failed to serialize cassette: {0}")]
    Serialize(#[from] serde_yaml::Error),
    /// Writing the cassette failed.
    #[error("failed to write cassette {}: {source}", path.display())]
    Write {
        /// Cassette path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The active record mode does not permit appending.
    #[error("record mode '{0}' does not allow appending interactions")]
    ReadOnly(RecordMode),
    /// The active record mode is not implemented.
    #[error("record mode '{0}' is not supported")]
    Unsupported(RecordMode),
}

/// Errors raised by an outbound call. Converted into a synthesized response.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The request could not be addressed.
    #[error("invalid upstream url {url}: {message}")]
    InvalidUrl {
        /// The URL as built from the request record.
        url: String,
        /// Parser message.
        message: String,
    },
    /// Transport level failure (connect, TLS, reset, timeout).
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Any other failure reported by an upstream implementation.
    #[error("{0}")]
    Other(String),
}

/// Errors raised while writing a report entry or the run metadata.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Filesystem failure.
    #[error("failed to write report {}: {source}", path.display())]
    Io {
        /// Target path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Report entry serialization failure.
    #[error("failed to serialize report: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// Metadata serialization failure.
    #[error("failed to serialize metadata: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level error returned by [`crate::run`].
#[derive(Debug, Error)]
pub enum Error {
    /// Command line could not be parsed.
    #[error(transparent)]
    Cli(#[from] clap::Error),
    /// Configuration error.
    #[error("configuration error - {0}")]
    Config(#[from] ConfigError),
    /// Cassette error.
    #[error(transparent)]
    Cassette(#[from] CassetteError),
    /// The HTTP client could not be set up.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    /// Listener or filesystem error outside the cassette and reports.
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted.
        context: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The `summary` command could not read a run's metadata.
    #[error("could not read metadata file {}: {message}", path.display())]
    Metadata {
        /// Metadata path.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },
}
