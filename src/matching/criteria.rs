//! Match criteria resolved once from configuration.
//!
//! Each criterion names one field of a request or response. Names are parsed
//! into enums up front so an unknown name fails at start-up, and matching is
//! an exhaustive `match` over the variants.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// A request field considered when deciding whether two requests match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestCriterion {
    /// HTTP verb.
    Method,
    /// URL scheme.
    Scheme,
    /// Host name.
    Host,
    /// Port number.
    Port,
    /// URL path.
    Path,
    /// Query pairs, compared as a multiset.
    Query,
    /// Raw body bytes.
    Body,
}

impl RequestCriterion {
    /// Every request criterion, in canonical order.
    pub const ALL: [Self; 7] =
        [Self::Method, Self::Scheme, Self::Host, Self::Port, Self::Path, Self::Query, Self::Body];

    /// Configuration name of the criterion.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Method => "method",
            Self::Scheme => "scheme",
            Self::Host => "host",
            Self::Port => "port",
            Self::Path => "path",
            Self::Query => "query",
            Self::Body => "body",
        }
    }
}

impl FromStr for RequestCriterion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|c| c.name().eq_ignore_ascii_case(s)).ok_or_else(|| {
            ConfigError::UnknownCriterion {
                kind: "request",
                name: s.to_string(),
                expected: names(Self::ALL.iter().map(|c| c.name())),
            }
        })
    }
}

impl fmt::Display for RequestCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A response field considered when deciding whether two responses match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCriterion {
    /// Status code only; the reason phrase is ignored.
    Status,
    /// Body, compared structurally for JSON content.
    Body,
    /// Full header multimap.
    Headers,
}

impl ResponseCriterion {
    /// Every response criterion, in canonical order.
    pub const ALL: [Self; 3] = [Self::Status, Self::Body, Self::Headers];

    /// Configuration name of the criterion.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Body => "body",
            Self::Headers => "headers",
        }
    }
}

impl FromStr for ResponseCriterion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|c| c.name().eq_ignore_ascii_case(s)).ok_or_else(|| {
            ConfigError::UnknownCriterion {
                kind: "response",
                name: s.to_string(),
                expected: names(Self::ALL.iter().map(|c| c.name())),
            }
        })
    }
}

impl fmt::Display for ResponseCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An ordered, de-duplicated set of criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criteria<C> {
    items: Vec<C>,
}

/// Criteria applied to requests.
pub type RequestCriteria = Criteria<RequestCriterion>;
/// Criteria applied to responses.
pub type ResponseCriteria = Criteria<ResponseCriterion>;

impl<C: Copy + PartialEq> Criteria<C> {
    /// Builds a set from the given criteria, dropping repeats.
    pub fn new(items: impl IntoIterator<Item = C>) -> Self {
        let mut unique = Vec::new();
        for item in items {
            if !unique.contains(&item) {
                unique.push(item);
            }
        }
        Self { items: unique }
    }

    /// Iterates the criteria in configured order.
    pub fn iter(&self) -> impl Iterator<Item = C> + '_ {
        self.items.iter().copied()
    }

    /// Whether `criterion` is enabled.
    pub fn contains(&self, criterion: C) -> bool {
        self.items.contains(&criterion)
    }

    /// Whether no criterion is enabled.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<C> Criteria<C>
where
    C: Copy + PartialEq + FromStr<Err = ConfigError>,
{
    /// Parses a whitespace separated list of names.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownCriterion`] for the first unknown name.
    pub fn parse_list(list: &str) -> Result<Self, ConfigError> {
        let items = list.split_whitespace().map(str::parse).collect::<Result<Vec<C>, _>>()?;
        Ok(Self::new(items))
    }
}

impl RequestCriteria {
    /// Every request criterion.
    #[must_use]
    pub fn all() -> Self {
        Self::new(RequestCriterion::ALL)
    }
}

impl ResponseCriteria {
    /// `status` and `body`.
    #[must_use]
    pub fn status_and_body() -> Self {
        Self::new([ResponseCriterion::Status, ResponseCriterion::Body])
    }
}

impl<C: fmt::Display> fmt::Display for Criteria<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            item.fmt(f)?;
        }
        Ok(())
    }
}

fn names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}
