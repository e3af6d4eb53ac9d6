//! Canonical request, response and interaction records.
//!
//! These are the values the match engine compares and the cassette stores.
//! A [`RequestRecord`] is immutable once built; responses are plain data.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::Url;

use crate::error::RecordError;

/// Status code of a response synthesized for a failed outbound call.
pub const UPSTREAM_FAILURE_STATUS: u16 = 490;

/// Ordered header multimap with case-insensitive lookup.
///
/// Insertion order and the original spelling of names are preserved so the
/// cassette reproduces what was on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value, keeping any existing values for the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replaces every value for `name` with a single value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.remove(&name);
        self.entries.push((name, value.into()));
    }

    /// Removes every value for `name`.
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    /// First value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    /// All values for `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Iterates `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of `(name, value)` pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy without any of the given names.
    #[must_use]
    pub fn without(&self, names: &[&str]) -> Self {
        let entries = self
            .entries
            .iter()
            .filter(|(n, _)| !names.iter().any(|drop| n.eq_ignore_ascii_case(drop)))
            .cloned()
            .collect();
        Self { entries }
    }

    /// Lower-cased names mapped to their values in order. Two header maps
    /// are the same multimap when their normalized forms are equal.
    #[must_use]
    pub fn normalized(&self) -> BTreeMap<String, Vec<&str>> {
        let mut map: BTreeMap<String, Vec<&str>> = BTreeMap::new();
        for (name, value) in &self.entries {
            map.entry(name.to_ascii_lowercase()).or_default().push(value.as_str());
        }
        map
    }

    /// Whether the `content-type` header starts with `application/json`.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.get("content-type").is_some_and(|ct| {
            ct.trim_start().to_ascii_lowercase().starts_with("application/json")
        })
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        Self { entries: iter.into_iter().map(|(n, v)| (n.into(), v.into())).collect() }
    }
}

// Serialized as `name: [value, ...]`, grouping by the name as first spelled.
impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
        for (name, value) in &self.entries {
            match groups.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
                Some((_, values)) => values.push(value.as_str()),
                None => groups.push((name.as_str(), vec![value.as_str()])),
            }
        }
        let mut map = serializer.serialize_map(Some(groups.len()))?;
        for (name, values) in groups {
            map.serialize_entry(name, &values)?;
        }
        map.end()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HeaderValues {
    One(String),
    Many(Vec<String>),
}

impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HeadersVisitor;

        impl<'de> Visitor<'de> for HeadersVisitor {
            type Value = Headers;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of header names to a value or a list of values")
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Headers, E> {
                Ok(Headers::new())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Headers, A::Error> {
                let mut headers = Headers::new();
                while let Some((name, values)) = access.next_entry::<String, HeaderValues>()? {
                    match values {
                        HeaderValues::One(value) => headers.append(name, value),
                        HeaderValues::Many(values) => {
                            for value in values {
                                headers.append(name.clone(), value);
                            }
                        }
                    }
                }
                Ok(headers)
            }
        }

        deserializer.deserialize_any(HeadersVisitor)
    }
}

/// An HTTP request as seen by the simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    method: String,
    scheme: String,
    host: String,
    port: u16,
    path: String,
    query: Vec<(String, String)>,
    headers: Headers,
    body: Vec<u8>,
}

impl RequestRecord {
    /// Builds a request from an absolute URL. The query string of `url` is
    /// decoded into ordered key-value pairs and the method is upper-cased.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL has no host or no known port.
    pub fn new(
        method: &str,
        url: &Url,
        headers: Headers,
        body: Vec<u8>,
    ) -> Result<Self, RecordError> {
        let (host, port) = origin(url)?;
        Ok(Self {
            method: method.to_ascii_uppercase(),
            scheme: url.scheme().to_string(),
            host: host.to_string(),
            port,
            path: url.path().to_string(),
            query: url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect(),
            headers,
            body,
        })
    }

    /// Same request addressed at another origin. Path, query, headers and
    /// body are kept; the `host` header, if present, follows the new origin.
    ///
    /// # Errors
    ///
    /// Returns an error when `target` has no host or no known port.
    pub fn retarget(&self, target: &Url) -> Result<Self, RecordError> {
        let (host, port) = origin(target)?;
        let mut headers = self.headers.clone();
        if headers.get("host").is_some() {
            headers.insert("host", authority(host, target.port()));
        }
        Ok(Self {
            scheme: target.scheme().to_string(),
            host: host.to_string(),
            port,
            headers,
            ..self.clone()
        })
    }

    /// Upper-case HTTP verb.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// URL scheme.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host name or address.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port, defaulted from the scheme when absent from the URL.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// URL path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Decoded query pairs in their original order.
    #[must_use]
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Raw request body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// `scheme://host:port/path`, without the query.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}{}", self.scheme, self.host, self.port, self.path)
    }

    /// Absolute URL including the re-encoded query.
    ///
    /// # Errors
    ///
    /// Returns the parser error when the parts do not form a valid URL.
    pub fn url(&self) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.base_url())?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        Ok(url)
    }
}

fn origin(url: &Url) -> Result<(&str, u16), RecordError> {
    let host = url.host_str().ok_or_else(|| RecordError::MissingHost(url.to_string()))?;
    let port =
        url.port_or_known_default().ok_or_else(|| RecordError::MissingPort(url.to_string()))?;
    Ok((host, port))
}

fn authority(host: &str, port: Option<u16>) -> String {
    match port {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// An HTTP response, either received from the target or synthesized locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    /// Status code.
    pub status_code: u16,
    /// Reason phrase.
    pub status_message: String,
    /// Response headers.
    pub headers: Headers,
    /// Raw response body.
    pub body: Vec<u8>,
    /// Set only on responses synthesized for a failed outbound call.
    pub error: Option<String>,
}

impl ResponseRecord {
    /// A response received from the target.
    #[must_use]
    pub fn new(
        status_code: u16,
        status_message: impl Into<String>,
        headers: Headers,
        body: Vec<u8>,
    ) -> Self {
        Self { status_code, status_message: status_message.into(), headers, body, error: None }
    }

    /// A response standing in for an outbound call that never completed.
    #[must_use]
    pub fn upstream_failure(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status_code: UPSTREAM_FAILURE_STATUS,
            status_message: message.clone(),
            headers: Headers::new(),
            body: message.clone().into_bytes(),
            error: Some(message),
        }
    }

    /// Whether this response carries the error marker.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// One recorded exchange with its timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interaction {
    /// The request as issued.
    pub request: RequestRecord,
    /// The response as received.
    pub response: ResponseRecord,
    /// Time since the previous interaction was issued; zero for the first.
    pub offset: Duration,
    /// Time the original call took to complete.
    pub latency: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn request_normalizes_method_and_decodes_query() {
        let req = RequestRecord::new(
            "get",
            &url("http://api.local/items?b=2&a=1&a=3"),
            Headers::new(),
            Vec::new(),
        )
        .unwrap();
        assert_eq!(req.method(), "GET");
        assert_eq!(req.port(), 80);
        assert_eq!(req.path(), "/items");
        assert_eq!(
            req.query(),
            &[("b".into(), "2".into()), ("a".into(), "1".into()), ("a".into(), "3".into())]
        );
        assert_eq!(req.url().unwrap().as_str(), "http://api.local/items?b=2&a=1&a=3");
    }

    #[test]
    fn retarget_moves_origin_and_host_header() {
        let headers: Headers =
            [("Host", "old.local:9000"), ("accept", "*/*")].into_iter().collect();
        let req =
            RequestRecord::new("POST", &url("http://old.local:9000/x?q=1"), headers, b"hi".to_vec())
                .unwrap();
        let moved = req.retarget(&url("https://new.local/")).unwrap();
        assert_eq!(moved.scheme(), "https");
        assert_eq!(moved.host(), "new.local");
        assert_eq!(moved.port(), 443);
        assert_eq!(moved.path(), "/x");
        assert_eq!(moved.headers().get("host"), Some("new.local"));
        assert_eq!(moved.body(), b"hi");
    }

    #[test]
    fn unaddressable_urls_are_typed_errors() {
        let no_host =
            RequestRecord::new("GET", &url("data:text/plain,hi"), Headers::new(), Vec::new());
        assert_eq!(no_host, Err(RecordError::MissingHost("data:text/plain,hi".to_string())));

        let req = RequestRecord::new("GET", &url("http://api.local/x"), Headers::new(), Vec::new())
            .unwrap();
        let no_port = req.retarget(&url("custom://api.local/"));
        assert!(matches!(no_port, Err(RecordError::MissingPort(_))));
    }

    #[test]
    fn headers_lookup_is_case_insensitive() {
        let mut headers = Headers::new();
        headers.append("Set-Cookie", "a=1");
        headers.append("set-cookie", "b=2");
        headers.append("Content-Type", "application/json; charset=utf-8");
        assert_eq!(headers.get_all("SET-COOKIE").collect::<Vec<_>>(), vec!["a=1", "b=2"]);
        assert!(headers.is_json());
        assert_eq!(headers.without(&["set-cookie"]).len(), 1);
    }

    #[test]
    fn headers_yaml_groups_repeated_names() {
        let headers: Headers =
            [("Set-Cookie", "a=1"), ("Date", "today"), ("Set-Cookie", "b=2")].into_iter().collect();
        let yaml = serde_yaml::to_string(&headers).unwrap();
        let back: Headers = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.normalized(), headers.normalized());
        assert_eq!(back.get_all("set-cookie").count(), 2);
    }

    #[test]
    fn headers_accept_single_string_values() {
        let back: Headers = serde_yaml::from_str("Content-Type: text/plain\n").unwrap();
        assert_eq!(back.get("content-type"), Some("text/plain"));
    }

    #[test]
    fn upstream_failure_carries_marker() {
        let resp = ResponseRecord::upstream_failure("connection refused");
        assert_eq!(resp.status_code, UPSTREAM_FAILURE_STATUS);
        assert!(resp.is_error());
        assert_eq!(resp.status_message, "connection refused");
    }
}
