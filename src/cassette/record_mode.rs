//! Record-mode policy governing appends to a cassette.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CassetteError, ConfigError};

/// Whether and how new interactions may be appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordMode {
    /// Never append.
    None,
    /// Append only when the cassette did not exist. Not implemented.
    Once,
    /// Append only unmatched requests. Not implemented.
    NewEpisodes,
    /// Append every interaction, matched or not.
    All,
}

impl RecordMode {
    /// Configuration name of the mode.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Once => "once",
            Self::NewEpisodes => "new_episodes",
            Self::All => "all",
        }
    }

    /// Fails for the policies that are carried by configuration only.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedRecordMode`] for `once` and `new_episodes`.
    pub fn ensure_supported(self) -> Result<Self, ConfigError> {
        match self {
            Self::None | Self::All => Ok(self),
            Self::Once | Self::NewEpisodes => Err(ConfigError::UnsupportedRecordMode(self)),
        }
    }

    /// Checks that an append is permitted under this policy.
    ///
    /// # Errors
    ///
    /// Returns [`CassetteError::ReadOnly`] for `none` and
    /// [`CassetteError::Unsupported`] for the unimplemented policies.
    pub fn check_append(self) -> Result<(), CassetteError> {
        match self {
            Self::All => Ok(()),
            Self::None => Err(CassetteError::ReadOnly(self)),
            Self::Once | Self::NewEpisodes => Err(CassetteError::Unsupported(self)),
        }
    }

    /// Whether this policy writes interactions.
    #[must_use]
    pub fn allows_writes(self) -> bool {
        self == Self::All
    }
}

impl FromStr for RecordMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::None, Self::Once, Self::NewEpisodes, Self::All]
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| "should be one of [none, once, new_episodes, all]".to_string())
    }
}

impl fmt::Display for RecordMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
