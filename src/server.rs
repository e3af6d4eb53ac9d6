//! Inbound HTTP listener handing every request to the controller.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::{HeaderName, HeaderValue};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use log::{info, warn};
use tokio::net::TcpListener;
use url::Url;

use crate::error::{Error, RecordError};
use crate::mode::Controller;
use crate::model::{Headers, RequestRecord, ResponseRecord};

/// Headers recomputed by the serving layer and never copied from a
/// forwarded response. Bodies arrive decoded, so the original encoding and
/// length no longer apply.
pub const STRIPPED_RESPONSE_HEADERS: &[&str] =
    &["content-encoding", "content-length", "transfer-encoding", "trailer", "connection"];

/// Largest inbound request body accepted, in bytes. Larger bodies are
/// refused with `413 Payload Too Large` before reaching the controller.
pub const INBOUND_BODY_LIMIT: usize = 16 * 1024 * 1024;

/// Catch-all router: every method and path goes to the controller.
pub fn router(controller: Arc<Controller>) -> Router {
    router_with_body_limit(controller, INBOUND_BODY_LIMIT)
}

/// Same as [`router`] with a custom inbound body limit.
pub fn router_with_body_limit(controller: Arc<Controller>, limit: usize) -> Router {
    Router::new().fallback(proxy).layer(DefaultBodyLimit::max(limit)).with_state(controller)
}

/// Binds `addr` and serves `router` until `shutdown` resolves. In-flight
/// requests are allowed to finish.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve<F>(addr: SocketAddr, router: Router, shutdown: F) -> Result<(), Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.map_err(|source| Error::Io {
        context: format!("failed to bind {addr}"),
        source,
    })?;
    match listener.local_addr() {
        Ok(local) => info!("Listening on http://{local}"),
        Err(_) => info!("Listening on http://{addr}"),
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|source| Error::Io { context: "server error".to_string(), source })
}

async fn proxy(
    State(controller): State<Arc<Controller>>,
    method: Method,
    uri: Uri,
    header_map: HeaderMap,
    body: Bytes,
) -> Response {
    let mut headers = Headers::new();
    for (name, value) in &header_map {
        headers.append(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
    }

    let (method, path, query) = (method.as_str(), uri.path(), uri.query());
    let target = controller.target();
    let record = match inbound_record(method, path, query, headers, body.to_vec(), target) {
        Ok(record) => record,
        Err(e) => {
            warn!("Cannot address inbound request at the target: {e}");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    into_response(controller.handle(record).await)
}

/// Addresses an inbound request at `target`: scheme, host and port come
/// from the target, the inbound path is appended to the target's base path,
/// the query comes from the inbound URI and the `host` header follows the
/// target.
fn inbound_record(
    method: &str,
    path: &str,
    query: Option<&str>,
    headers: Headers,
    body: Vec<u8>,
    target: &Url,
) -> Result<RequestRecord, RecordError> {
    let mut url = target.clone();
    let base = target.path().trim_end_matches('/');
    url.set_path(&format!("{base}{path}"));
    url.set_query(query);
    RequestRecord::new(method, &url, headers, body)?.retarget(target)
}

/// Converts a controller response for the inbound caller. Synthesized
/// upstream failures become `502 Bad Gateway` carrying the failure text.
fn into_response(mut record: ResponseRecord) -> Response {
    if let Some(error) = record.error.take() {
        return (StatusCode::BAD_GATEWAY, error).into_response();
    }

    let mut response = Response::new(Body::from(record.body));
    *response.status_mut() =
        StatusCode::from_u16(record.status_code).unwrap_or(StatusCode::BAD_GATEWAY);
    let headers = response.headers_mut();
    for (name, value) in record.headers.without(STRIPPED_RESPONSE_HEADERS).iter() {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => warn!("Dropping unrepresentable response header {name}"),
        }
    }
    response
}
