// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Middleware that intercepts `/{app}/...` in front of the host framework.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{CONNECTION, UPGRADE};
use axum::http::{Request, Response, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use tracing::error;

use dh_registry::Registry;

use crate::http;
use crate::path::app_name_from_path;
use crate::ws;

/// Upstream HTTP budget for a proxied request.
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared proxy dependencies: the registry for routing decisions and one
/// upstream client reused across requests.
pub struct ProxyState {
    registry: Arc<Registry>,
    client: reqwest::Client,
}

impl ProxyState {
    pub fn new(registry: Arc<Registry>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            // Inner apps are loopback-only; never route through an env proxy
            .no_proxy()
            .build()
            // Builder only fails on TLS/resolver misconfiguration, neither of
            // which is reachable from these options
            .unwrap_or_default();
        Self { registry, client }
    }
}

/// True when the request asks to upgrade to a WebSocket.
fn wants_websocket(req: &Request<Body>) -> bool {
    let upgrade = req
        .headers()
        .get(UPGRADE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("websocket"));
    let connection = req
        .headers()
        .get(CONNECTION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.to_ascii_lowercase().contains("upgrade"));
    upgrade && connection
}

/// Route `/{app}/...` to the app's inner port; pass everything else to the
/// wrapped router.
pub async fn proxy_middleware(
    State(state): State<Arc<ProxyState>>,
    req: Request<Body>,
    next: Next,
) -> Response<Body> {
    let Some(name) = app_name_from_path(req.uri().path()).map(str::to_string) else {
        return next.run(req).await;
    };

    let record = match state.registry.get(&name) {
        Ok(Some(record)) => record,
        Ok(None) => return next.run(req).await,
        Err(e) => {
            error!(app = %name, error = %e, "registry read failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if !record.is_running() {
        return http::not_running_response(&name, &record);
    }

    if wants_websocket(&req) {
        ws::handle(record, req).await
    } else {
        http::forward(&state.client, &record, req).await
    }
}

#[cfg(test)]
#[path = "layer_tests.rs"]
mod tests;
