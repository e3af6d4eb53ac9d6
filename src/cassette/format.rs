//! Cassette document structures and their conversion to records.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::RecordError;
use crate::model::{Headers, Interaction, RequestRecord, ResponseRecord};

/// The on-disk cassette document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CassetteFile {
    /// When the cassette was last written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
    /// Ordered list of interactions.
    #[serde(default)]
    pub interactions: Vec<StoredInteraction>,
}

/// A single stored request/response pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredInteraction {
    /// The recorded request.
    pub request: StoredRequest,
    /// The recorded response.
    pub response: StoredResponse,
}

/// A request as written to the cassette.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredRequest {
    /// HTTP verb.
    pub method: String,
    /// `scheme://host:port/path`, without the query.
    pub url: String,
    /// Decoded query pairs in their original order.
    #[serde(default)]
    pub query: Vec<(String, String)>,
    /// Request headers.
    #[serde(default)]
    pub headers: Headers,
    /// Request body.
    #[serde(default)]
    pub body: StoredBody,
    /// Seconds since the previous interaction was issued.
    #[serde(default, with = "seconds")]
    pub offset: Duration,
}

/// A response as written to the cassette or a report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredResponse {
    /// Status line.
    pub status: StoredStatus,
    /// Response headers.
    #[serde(default)]
    pub headers: Headers,
    /// Response body.
    #[serde(default)]
    pub body: StoredBody,
    /// Seconds the original call took.
    #[serde(default, with = "seconds")]
    pub latency: Duration,
    /// Failure text for responses synthesized after a failed call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Status code and reason phrase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredStatus {
    /// Status code.
    pub code: u16,
    /// Reason phrase.
    #[serde(default)]
    pub message: String,
}

/// A body kept as text when it is valid UTF-8 and as bytes otherwise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum StoredBody {
    /// UTF-8 body.
    Text {
        /// Body text.
        string: String,
    },
    /// Binary body.
    Binary {
        /// Body bytes.
        bytes: Vec<u8>,
    },
}

impl Default for StoredBody {
    fn default() -> Self {
        Self::Text { string: String::new() }
    }
}

impl From<&[u8]> for StoredBody {
    fn from(bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(text) => Self::Text { string: text.to_string() },
            Err(_) => Self::Binary { bytes: bytes.to_vec() },
        }
    }
}

impl StoredBody {
    /// The raw body bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Text { string } => string.into_bytes(),
            Self::Binary { bytes } => bytes,
        }
    }
}

impl StoredRequest {
    /// Snapshot of a request with the given offset.
    #[must_use]
    pub fn from_record(request: &RequestRecord, offset: Duration) -> Self {
        Self {
            method: request.method().to_string(),
            url: request.base_url(),
            query: request.query().to_vec(),
            headers: request.headers().clone(),
            body: StoredBody::from(request.body()),
            offset,
        }
    }

    /// Rebuilds the request record.
    ///
    /// # Errors
    ///
    /// Returns an error when the stored URL cannot be parsed or addressed.
    pub fn to_record(&self) -> Result<RequestRecord, RecordError> {
        let mut url = Url::parse(&self.url).map_err(|e| RecordError::InvalidUrl {
            url: self.url.clone(),
            message: e.to_string(),
        })?;
        url.set_query(None);
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        RequestRecord::new(&self.method, &url, self.headers.clone(), self.body.clone().into_bytes())
    }
}

impl StoredResponse {
    /// Snapshot of a response with the given latency.
    #[must_use]
    pub fn from_record(response: &ResponseRecord, latency: Duration) -> Self {
        Self {
            status: StoredStatus {
                code: response.status_code,
                message: response.status_message.clone(),
            },
            headers: response.headers.clone(),
            body: StoredBody::from(response.body.as_slice()),
            latency,
            error: response.error.clone(),
        }
    }

    /// Rebuilds the response record.
    #[must_use]
    pub fn to_record(&self) -> ResponseRecord {
        ResponseRecord {
            status_code: self.status.code,
            status_message: self.status.message.clone(),
            headers: self.headers.clone(),
            body: self.body.clone().into_bytes(),
            error: self.error.clone(),
        }
    }
}

impl From<&Interaction> for StoredInteraction {
    fn from(interaction: &Interaction) -> Self {
        Self {
            request: StoredRequest::from_record(&interaction.request, interaction.offset),
            response: StoredResponse::from_record(&interaction.response, interaction.latency),
        }
    }
}

impl StoredInteraction {
    /// Rebuilds the interaction.
    ///
    /// # Errors
    ///
    /// Returns an error when the stored request is invalid.
    pub fn to_interaction(&self) -> Result<Interaction, RecordError> {
        Ok(Interaction {
            request: self.request.to_record()?,
            response: self.response.to_record(),
            offset: self.request.offset,
            latency: self.response.latency,
        })
    }
}

/// Serde helper writing a [`Duration`] as fractional seconds.
pub(crate) mod seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_interaction() -> Interaction {
        let url = Url::parse("http://api.local:8000/users?page=2&sort=name").unwrap();
        let headers: Headers = [("Accept", "application/json"), ("X-Trace", "a"), ("X-Trace", "b")]
            .into_iter()
            .collect();
        let request = RequestRecord::new("GET", &url, headers, Vec::new()).unwrap();
        let response = ResponseRecord::new(
            200,
            "OK",
            [("Content-Type", "image/png")].into_iter().collect(),
            vec![0x89, b'P', b'N', b'G', 0xff, 0x00],
        );
        Interaction {
            request,
            response,
            offset: Duration::from_millis(1500),
            latency: Duration::from_millis(250),
        }
    }

    #[test]
    fn yaml_round_trip_keeps_bytes_and_headers() {
        let interaction = sample_interaction();
        let file = CassetteFile {
            recorded_at: Some(Utc::now()),
            interactions: vec![StoredInteraction::from(&interaction)],
        };
        let yaml = serde_yaml::to_string(&file).expect("serialize");
        let back: CassetteFile = serde_yaml::from_str(&yaml).expect("deserialize");
        assert_eq!(back, file);

        let restored = back.interactions[0].to_interaction().unwrap();
        assert_eq!(restored, interaction);
    }

    #[test]
    fn text_bodies_are_stored_as_strings() {
        assert_eq!(StoredBody::from(&b"hello"[..]), StoredBody::Text { string: "hello".into() });
        assert!(matches!(StoredBody::from(&[0xffu8, 0xfe][..]), StoredBody::Binary { .. }));
    }

    #[test]
    fn reads_hand_written_cassette() {
        let yaml = r"
interactions:
  - request:
      method: post
      url: http://api.local/login
      headers:
        Content-Type: application/json
      body:
        string: '{}'
      offset: 0
    response:
      status:
        code: 201
        message: Created
      latency: 0.5
";
        let file: CassetteFile = serde_yaml::from_str(yaml).unwrap();
        let interaction = file.interactions[0].to_interaction().unwrap();
        assert_eq!(interaction.request.method(), "POST");
        assert_eq!(interaction.request.port(), 80);
        assert_eq!(interaction.response.status_code, 201);
        assert_eq!(interaction.latency, Duration::from_millis(500));
        assert!(interaction.response.body.is_empty());
    }

    #[test]
    fn negative_latency_is_rejected() {
        let yaml = "status: {code: 200}\nlatency: -1\n";
        assert!(serde_yaml::from_str::<StoredResponse>(yaml).is_err());
    }
}
