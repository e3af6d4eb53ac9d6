//! Run configuration read from `TAPEDECK_*` environment variables.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use url::Url;

use crate::cassette::RecordMode;
use crate::error::ConfigError;
use crate::matching::{RequestCriteria, ResponseCriteria};
use crate::mode::Mode;

/// Active mode.
pub const MODE: &str = "TAPEDECK_MODE";
/// Base URL of the real upstream.
pub const TARGET_URL: &str = "TAPEDECK_TARGET_URL";
/// Cassette file path.
pub const CASSETTE: &str = "TAPEDECK_CASSETTE";
/// Listener address.
pub const HOST: &str = "TAPEDECK_HOST";
/// Listener port.
pub const PORT: &str = "TAPEDECK_PORT";
/// Space separated request criteria.
pub const REQUEST_MATCH_ON: &str = "TAPEDECK_REQUEST_MATCH_ON";
/// Space separated response criteria.
pub const RESPONSE_MATCH_ON: &str = "TAPEDECK_RESPONSE_MATCH_ON";
/// Record-mode policy.
pub const RECORD_MODE: &str = "TAPEDECK_RECORD_MODE";
/// Report output directory.
pub const REPORT_DIR: &str = "TAPEDECK_REPORT_DIR";
/// Whether OBSERVE also reports matching responses.
pub const REPORT_MATCHES: &str = "TAPEDECK_REPORT_MATCHES";

const DEFAULT_CASSETTE: &str = "cassette.yml";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8081;
const DEFAULT_REPORT_DIR: &str = "reports";

/// Validated, immutable configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Operating mode.
    pub mode: Mode,
    /// Base URL requests are forwarded to.
    pub target: Url,
    /// Cassette file.
    pub cassette: PathBuf,
    /// Address the inbound listener binds to.
    pub listen: SocketAddr,
    /// Criteria deciding whether two requests are the same.
    pub request_criteria: RequestCriteria,
    /// Criteria deciding whether two responses are the same.
    pub response_criteria: ResponseCriteria,
    /// Policy for appending to the cassette.
    pub record_mode: RecordMode,
    /// Directory receiving report entries and metadata.
    pub report_dir: PathBuf,
    /// Report matching responses too.
    pub report_matches: bool,
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when a required variable is missing or any value is
    /// invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// a variable or `None` when it is unset.
    ///
    /// # Errors
    ///
    /// Returns an error when a required variable is missing or any value is
    /// invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mode: Mode = get(MODE)
            .ok_or(ConfigError::Missing(MODE))?
            .parse()
            .map_err(|message| ConfigError::Invalid { key: MODE, message })?;

        let target = parse_target(&get(TARGET_URL).ok_or(ConfigError::Missing(TARGET_URL))?)?;

        let host: IpAddr = get(HOST)
            .as_deref()
            .unwrap_or(DEFAULT_HOST)
            .parse()
            .map_err(|e| ConfigError::Invalid { key: HOST, message: format!("{e}") })?;
        let port = match get(PORT) {
            Some(port) => port
                .parse::<u16>()
                .map_err(|e| ConfigError::Invalid { key: PORT, message: format!("{e}") })?,
            None => DEFAULT_PORT,
        };

        let request_criteria = match get(REQUEST_MATCH_ON) {
            Some(list) => RequestCriteria::parse_list(&list)?,
            None => RequestCriteria::all(),
        };
        if request_criteria.is_empty() {
            return Err(ConfigError::Invalid {
                key: REQUEST_MATCH_ON,
                message: "no criteria given".into(),
            });
        }
        let response_criteria = match get(RESPONSE_MATCH_ON) {
            Some(list) => ResponseCriteria::parse_list(&list)?,
            None => ResponseCriteria::status_and_body(),
        };
        if response_criteria.is_empty() {
            return Err(ConfigError::Invalid {
                key: RESPONSE_MATCH_ON,
                message: "no criteria given".into(),
            });
        }

        let record_mode = match get(RECORD_MODE) {
            Some(value) => value
                .parse::<RecordMode>()
                .map_err(|message| ConfigError::Invalid { key: RECORD_MODE, message })?
                .ensure_supported()?,
            None => mode.default_record_mode(),
        };
        if record_mode.allows_writes() && mode != Mode::Record {
            return Err(ConfigError::Invalid {
                key: RECORD_MODE,
                message: format!("'{record_mode}' is only allowed in record mode"),
            });
        }

        let report_matches = match get(REPORT_MATCHES) {
            Some(flag) => parse_flag(&flag).ok_or_else(|| ConfigError::Invalid {
                key: REPORT_MATCHES,
                message: format!("expected true or false, got '{flag}'"),
            })?,
            None => false,
        };

        Ok(Self {
            mode,
            target,
            cassette: get(CASSETTE).map_or_else(|| PathBuf::from(DEFAULT_CASSETTE), PathBuf::from),
            listen: SocketAddr::new(host, port),
            request_criteria,
            response_criteria,
            record_mode,
            report_dir: get(REPORT_DIR)
                .map_or_else(|| PathBuf::from(DEFAULT_REPORT_DIR), PathBuf::from),
            report_matches,
        })
    }

    /// Loads variables from `path`, or from `.env` in the working directory
    /// when no path is given, without overriding variables already set.
    ///
    /// # Errors
    ///
    /// Returns an error when an explicitly given file cannot be loaded.
    pub fn load_env_file(path: Option<&Path>) -> Result<(), ConfigError> {
        match path {
            Some(path) => dotenvy::from_path(path).map_err(|e| ConfigError::Invalid {
                key: "--env-file",
                message: format!("{}: {e}", path.display()),
            }),
            None => {
                if let Ok(path) = dotenvy::dotenv() {
                    log::debug!("Loaded environment from {}", path.display());
                }
                Ok(())
            }
        }
    }
}

fn parse_target(value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::Invalid { key: TARGET_URL, message: e.to_string() })?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::Invalid {
            key: TARGET_URL,
            message: format!("'{value}' is not an http(s) URL with a host"),
        });
    }
    Ok(url)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
