//! Inbound HTTP adapter tests driving the router in-process.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;
use url::Url;

use tapedeck::adapters::manual::{ManualClock, ScriptedReply, ScriptedUpstream};
use tapedeck::cassette::{Cassette, CassetteStore};
use tapedeck::context::ServiceContext;
use tapedeck::matching::RequestCriteria;
use tapedeck::mode::{Controller, Mode};
use tapedeck::model::{Headers, ResponseRecord};
use tapedeck::report::Reporter;
use tapedeck::server;

const TARGET: &str = "http://backend.local:9000/";

type Setup = (axum::Router, Arc<ScriptedUpstream>, Arc<CassetteStore>, tempfile::TempDir);

fn setup(mode: Mode, upstream: ScriptedUpstream) -> Setup {
    setup_with_body_limit(mode, upstream, server::INBOUND_BODY_LIMIT)
}

fn setup_with_body_limit(mode: Mode, upstream: ScriptedUpstream, limit: usize) -> Setup {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::default());
    let upstream = Arc::new(upstream);
    let store = Arc::new(CassetteStore::new(
        dir.path().join("cassette.yml"),
        Cassette::new(RequestCriteria::all()),
        mode.default_record_mode(),
    ));
    let reporter = Arc::new(Reporter::new(dir.path().join("reports"), mode, clock.clone()));
    let controller = Controller::new(
        mode,
        ServiceContext::new(clock, upstream.clone()),
        store.clone(),
        reporter,
        Url::parse(TARGET).unwrap(),
    );
    let router = server::router_with_body_limit(Arc::new(controller), limit);
    (router, upstream, store, dir)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn upstream_failure_becomes_bad_gateway() {
    let upstream = ScriptedUpstream::new([ScriptedReply::fail("connection refused")]);
    let (router, _, _, _dir) = setup(Mode::Serve, upstream);

    let response = router.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&body).contains("connection refused"));
}

#[tokio::test]
async fn forwarded_response_keeps_status_body_and_headers_but_not_encoding() {
    let mut headers = Headers::new();
    headers.append("Content-Type", "text/plain");
    headers.append("Content-Encoding", "gzip");
    headers.append("Transfer-Encoding", "chunked");
    headers.append("X-Request-Id", "abc");
    let teapot = ResponseRecord::new(418, "I'm a teapot", headers, b"short and stout".to_vec());
    let upstream = ScriptedUpstream::new([ScriptedReply::respond(teapot)]);
    let (router, _, _, _dir) = setup(Mode::Serve, upstream);

    let response = router.oneshot(get("/tea")).await.unwrap();

    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(response.headers()["x-request-id"], "abc");
    assert_eq!(response.headers()["content-type"], "text/plain");
    assert!(response.headers().get("content-encoding").is_none());
    assert!(response.headers().get("transfer-encoding").is_none());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"short and stout");
}

#[tokio::test]
async fn inbound_request_is_forwarded_to_the_target_and_recorded() {
    let created = ResponseRecord::new(201, "Created", Headers::new(), b"{}".to_vec());
    let reply = ScriptedReply::respond(created).after(Duration::from_millis(40));
    let (router, upstream, store, _dir) = setup(Mode::Record, ScriptedUpstream::new([reply]));

    let request = Request::builder()
        .method("POST")
        .uri("/orders?priority=high&tag=a&tag=b")
        .header("host", "localhost:8081")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"qty":2}"#))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let received = upstream.received();
    assert_eq!(received.len(), 1);
    let sent = &received[0];
    assert_eq!(sent.method(), "POST");
    assert_eq!((sent.host(), sent.port()), ("backend.local", 9000));
    assert_eq!(sent.path(), "/orders");
    assert_eq!(sent.query().len(), 3);
    assert_eq!(sent.headers().get("host"), Some("backend.local:9000"));
    assert_eq!(sent.body(), br#"{"qty":2}"#);

    let recorded = store.interactions().await;
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].request, *sent);
    assert_eq!(recorded[0].response.status_code, 201);
}

#[tokio::test]
async fn oversized_bodies_are_refused_before_forwarding() {
    let upstream = ScriptedUpstream::repeating(ScriptedReply::respond(ResponseRecord::new(
        200,
        "OK",
        Headers::new(),
        Vec::new(),
    )));
    let (router, upstream, store, _dir) = setup_with_body_limit(Mode::Record, upstream, 8);

    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .body(Body::from("sixteen bytes!!!"))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(upstream.received().is_empty());
    assert!(store.is_empty().await);
}
