// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP proxy round-trips against a live local upstream.

use crate::prelude::*;

use std::io::Write;

use axum::body::{Body, Bytes};
use axum::http::header::{HeaderMap, HeaderValue, CONTENT_ENCODING};
use axum::http::Request;
use axum::routing::get;
use axum::Router;
use flate2::write::GzEncoder;
use flate2::Compression;

const GZIP_PAYLOAD: &str = "decoded payload the outer client must see";

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

async fn gzip_handler() -> (HeaderMap, Vec<u8>) {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
    (headers, gzip(GZIP_PAYLOAD.as_bytes()))
}

async fn chunked_handler() -> Body {
    let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
        Ok(Bytes::from_static(b"part1-")),
        Ok(Bytes::from_static(b"part2-")),
        Ok(Bytes::from_static(b"part3")),
    ];
    Body::from_stream(futures_util::stream::iter(chunks))
}

/// Everything else echoes `path query` so routing is observable.
async fn echo_handler(req: Request<Body>) -> String {
    format!("{} {}", req.uri().path(), req.uri().query().unwrap_or(""))
}

/// Minimal inner app: `/` says hello, plus gzip/chunked/echo endpoints.
async fn spawn_upstream() -> u16 {
    let app = Router::new()
        .route("/", get(|| async { "hello" }))
        .route("/gzip", get(gzip_handler))
        .route("/chunked", get(chunked_handler))
        .fallback(echo_handler);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    port
}

#[tokio::test]
async fn root_of_a_running_app_proxies_the_body() {
    let gateway = TestGateway::start().await;
    let upstream = spawn_upstream().await;
    gateway.plant_running("demo", upstream, None);

    let response = http_client().get(format!("{}/demo/", gateway.base)).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert!(response.headers().get(CONTENT_ENCODING).is_none());
    assert_eq!(response.text().await.unwrap(), "hello");
}

#[tokio::test]
async fn gzip_upstream_reaches_the_client_decoded() {
    let gateway = TestGateway::start().await;
    let upstream = spawn_upstream().await;
    gateway.plant_running("demo", upstream, None);

    let response =
        http_client().get(format!("{}/demo/gzip", gateway.base)).send().await.unwrap();

    // No content-encoding survives, and content-length matches the decoded
    // body, not the compressed one
    assert!(response.headers().get(CONTENT_ENCODING).is_none());
    assert_eq!(response.content_length(), Some(GZIP_PAYLOAD.len() as u64));
    assert_eq!(response.text().await.unwrap(), GZIP_PAYLOAD);
}

#[tokio::test]
async fn chunked_upstream_is_reassembled() {
    let gateway = TestGateway::start().await;
    let upstream = spawn_upstream().await;
    gateway.plant_running("demo", upstream, None);

    let response =
        http_client().get(format!("{}/demo/chunked", gateway.base)).send().await.unwrap();
    assert_eq!(response.content_length(), Some("part1-part2-part3".len() as u64));
    assert_eq!(response.text().await.unwrap(), "part1-part2-part3");
}

#[tokio::test]
async fn prefix_is_stripped_and_query_preserved() {
    let gateway = TestGateway::start().await;
    let upstream = spawn_upstream().await;
    gateway.plant_running("demo", upstream, None);

    let response = http_client()
        .get(format!("{}/demo/sub/path?q=1", gateway.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.text().await.unwrap(), "/sub/path q=1");
}

#[tokio::test]
async fn reserved_prefix_wins_over_a_registered_collision() {
    let gateway = TestGateway::start().await;
    let upstream = spawn_upstream().await;
    // Plant a colliding record directly; the REST surface refuses the name
    gateway.plant_running("health", upstream, None);

    let value: serde_json::Value = http_client()
        .get(format!("{}/health", gateway.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    // The gateway's own health route answered, not the upstream echo
    assert_eq!(value, serde_json::json!({ "status": "ok" }));
}

#[tokio::test]
async fn running_app_with_closed_port_gets_the_502_page() {
    let gateway = TestGateway::start().await;
    // Find a port that's definitely closed
    let probe = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let closed = probe.local_addr().unwrap().port();
    drop(probe);
    gateway.plant_running("dead", closed, None);

    let response = http_client().get(format!("{}/dead/", gateway.base)).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);
    let body = response.text().await.unwrap();
    assert!(body.contains("/dead/ is not running"));
}

#[tokio::test]
async fn post_bodies_are_forwarded_whole() {
    let gateway = TestGateway::start().await;

    // Upstream that echoes the request body back
    let app = Router::new().fallback(|body: Bytes| async move { body });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    gateway.plant_running("echo", upstream, None);

    let payload = "x".repeat(64 * 1024);
    let response = http_client()
        .post(format!("{}/echo/submit", gateway.base))
        .body(payload.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(response.text().await.unwrap(), payload);
}
