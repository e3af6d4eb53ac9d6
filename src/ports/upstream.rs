//! Upstream port for issuing a request to the real target.

use std::future::Future;
use std::pin::Pin;

use crate::error::UpstreamError;
use crate::model::{RequestRecord, ResponseRecord};

/// Boxed future type alias used by [`Upstream`] to keep the trait dyn-compatible.
pub type UpstreamFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ResponseRecord, UpstreamError>> + Send + 'a>>;

/// Sends a request to the target and returns whatever it answered.
///
/// Any HTTP status, including 4xx and 5xx, is a successful call. Errors are
/// reserved for calls that produced no response at all.
pub trait Upstream: Send + Sync {
    /// Issues `request` and waits for the full response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be addressed or the connection fails.
    fn send(&self, request: &RequestRecord) -> UpstreamFuture<'_>;
}
