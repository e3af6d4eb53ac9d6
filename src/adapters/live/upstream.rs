//! Live adapter for the `Upstream` port using `reqwest`.

use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{redirect, Client, Method};

use crate::error::UpstreamError;
use crate::model::{Headers, RequestRecord, ResponseRecord};
use crate::ports::upstream::{Upstream, UpstreamFuture};

/// Request headers the client computes itself.
const CLIENT_MANAGED_HEADERS: &[&str] =
    &["host", "content-length", "transfer-encoding", "connection"];

/// Forwards requests to the target over HTTP.
///
/// Redirects are returned as-is rather than followed, and compressed bodies
/// are decoded so recorded and served bodies are plain.
#[derive(Debug, Clone)]
pub struct LiveUpstream {
    client: Client,
}

impl LiveUpstream {
    /// Creates a live upstream with its own connection pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, UpstreamError> {
        let client = Client::builder().redirect(redirect::Policy::none()).build()?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Upstream for LiveUpstream {
    fn send(&self, request: &RequestRecord) -> UpstreamFuture<'_> {
        let request = request.clone();

        Box::pin(async move {
            let url = request.url().map_err(|e| UpstreamError::InvalidUrl {
                url: request.base_url(),
                message: e.to_string(),
            })?;
            let method = Method::from_bytes(request.method().as_bytes()).map_err(|e| {
                UpstreamError::Other(format!("invalid method {}: {e}", request.method()))
            })?;

            let mut builder = self.client.request(method, url);
            for (name, value) in request.headers().iter() {
                if CLIENT_MANAGED_HEADERS.iter().any(|h| name.eq_ignore_ascii_case(h)) {
                    continue;
                }
                let (Ok(name), Ok(value)) =
                    (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value))
                else {
                    log::warn!("Dropping unforwardable header {name}");
                    continue;
                };
                builder = builder.header(name, value);
            }
            if !request.body().is_empty() {
                builder = builder.body(request.body().to_vec());
            }

            let response = builder.send().await?;

            let status = response.status();
            let mut headers = Headers::new();
            for (name, value) in response.headers() {
                headers.append(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
            }
            let body = response.bytes().await?;

            Ok(ResponseRecord::new(
                status.as_u16(),
                status.canonical_reason().unwrap_or_default(),
                headers,
                body.to_vec(),
            ))
        })
    }
}
