// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The outer router: REST surface + proxy middleware.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::middleware;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde_json::json;

use dh_proxy::{proxy_middleware, ProxyState};
use dh_supervisor::Supervisor;

use crate::webapp::{dispatch, WebappAction};

/// Shared state behind the REST handlers.
pub struct GatewayState {
    pub supervisor: Arc<Supervisor>,
}

/// Build the outer router: `/webapp` + `/health` wrapped by the proxy
/// middleware, so `/{app}/...` is intercepted before routing.
pub fn router(state: Arc<GatewayState>) -> Router {
    let proxy = Arc::new(ProxyState::new(Arc::clone(state.supervisor.registry())));
    Router::new()
        .route("/webapp", get(webapp_get).post(webapp_post))
        .route("/health", get(health))
        .with_state(state)
        .layer(middleware::from_fn_with_state(proxy, proxy_middleware))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// GET side: read-only actions through the query string.
async fn webapp_get(
    State(state): State<Arc<GatewayState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    match WebappAction::from_query(&params) {
        Ok(action) => Json(dispatch(&state.supervisor, action).await).into_response(),
        Err(message) => Json(json!({ "error": message })).into_response(),
    }
}

/// POST side: any action, JSON body. Unknown actions and malformed bodies
/// come back as `{error}` rather than a bare 400, so agent tooling always
/// sees JSON.
async fn webapp_post(State(state): State<Arc<GatewayState>>, body: Bytes) -> Response {
    match WebappAction::from_json(&body) {
        Ok(action) => Json(dispatch(&state.supervisor, action).await).into_response(),
        Err(message) => Json(json!({ "error": message })).into_response(),
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
