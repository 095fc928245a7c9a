// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Buffered HTTP forwarding to an app's inner port.
//!
//! The upstream client transparently decompresses `gzip`/`deflate`/`br`, so
//! the response body we hold is decoded. Forwarding the original
//! `content-encoding` (or `content-length`) with a decoded body would make
//! downstream framers reject the response — both are stripped and a fresh
//! `content-length` is computed over the decoded bytes.

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderName};
use axum::http::{Request, Response, StatusCode};
use tracing::{debug, warn};

use dh_core::AppRecord;

use crate::pages::not_running_html;
use crate::path::strip_app_prefix;

/// Hop-by-hop request headers never forwarded upstream. `host` is included:
/// the client rebuilds it for the inner authority.
fn request_skip() -> Vec<HeaderName> {
    vec![
        header::HOST,
        header::CONNECTION,
        HeaderName::from_static("keep-alive"),
        header::TRANSFER_ENCODING,
        header::TE,
        HeaderName::from_static("trailers"),
        header::UPGRADE,
        header::PROXY_AUTHORIZATION,
    ]
}

/// Hop-by-hop response headers, plus the encoding pair (see module docs).
fn response_skip() -> Vec<HeaderName> {
    vec![
        header::CONNECTION,
        HeaderName::from_static("keep-alive"),
        header::TRANSFER_ENCODING,
        header::TE,
        HeaderName::from_static("trailers"),
        header::UPGRADE,
        header::CONTENT_ENCODING,
        header::CONTENT_LENGTH,
    ]
}

/// Copy `headers` minus the entries named in `skip`.
fn filter_headers(headers: &HeaderMap, skip: &[HeaderName]) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in headers {
        if !skip.contains(name) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

fn html_response(status: StatusCode, body: String) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/html; charset=utf-8"));
    response
}

fn plain_response(status: StatusCode, body: String) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}

/// 503 page for a registered app that isn't running.
pub(crate) fn not_running_response(name: &str, record: &AppRecord) -> Response<Body> {
    html_response(StatusCode::SERVICE_UNAVAILABLE, not_running_html(name, Some(record)))
}

/// Forward one fully buffered request to `record`'s inner port.
pub(crate) async fn forward(
    client: &reqwest::Client,
    record: &AppRecord,
    req: Request<Body>,
) -> Response<Body> {
    let (parts, body) = req.into_parts();

    let stripped = strip_app_prefix(parts.uri.path(), &record.name);
    let target = match parts.uri.query() {
        Some(query) => format!("http://127.0.0.1:{}{}?{}", record.port, stripped, query),
        None => format!("http://127.0.0.1:{}{}", record.port, stripped),
    };
    debug!(app = %record.name, %target, method = %parts.method, "proxying");

    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return plain_response(
                StatusCode::BAD_GATEWAY,
                format!("Proxy error for '{}': {}", record.name, e),
            )
        }
    };

    let upstream = client
        .request(parts.method, &target)
        .headers(filter_headers(&parts.headers, &request_skip()))
        .body(body)
        .send()
        .await;

    let upstream = match upstream {
        Ok(resp) => resp,
        Err(e) if e.is_connect() => {
            // App registered and marked running, but the port isn't listening yet
            warn!(app = %record.name, error = %e, "inner port unreachable");
            return html_response(
                StatusCode::BAD_GATEWAY,
                not_running_html(&record.name, Some(record)),
            );
        }
        Err(e) => {
            warn!(app = %record.name, error = %e, "upstream error");
            return plain_response(
                StatusCode::BAD_GATEWAY,
                format!("Proxy error for '{}': {}", record.name, e),
            );
        }
    };

    let status = upstream.status();
    let headers = filter_headers(upstream.headers(), &response_skip());
    let bytes = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            return plain_response(
                StatusCode::BAD_GATEWAY,
                format!("Proxy error for '{}': {}", record.name, e),
            )
        }
    };

    let mut response = Response::new(Body::from(bytes.clone()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
        .headers_mut()
        .insert(header::CONTENT_LENGTH, header::HeaderValue::from(bytes.len()));
    response
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
