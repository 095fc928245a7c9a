// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Raw-TCP WebSocket tunnel.
//!
//! The inner app only needs to speak RFC 6455 over TCP — no ASGI/WSGI
//! assumption. The proxy performs a client handshake against the inner
//! port, accepts the outer client with whatever subprotocol the app chose,
//! and then pumps frames both ways. Data frames that arrive in the same TCP
//! segment as the `101 Switching Protocols` stay queued inside the client's
//! read buffer, so nothing is dropped between handshake and pump start.

use std::time::Duration;

use axum::body::Body;
use axum::extract::ws::{CloseFrame, Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::FromRequestParts;
use axum::http::header::{HeaderValue, SEC_WEBSOCKET_PROTOCOL};
use axum::http::{Request, Response};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame as InnerCloseFrame;
use tokio_tungstenite::tungstenite::Message as InnerMessage;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, warn};

use dh_core::AppRecord;

use crate::path::strip_app_prefix;

/// TCP connect budget for the inner port.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Overall budget for the inner handshake (connect excluded).
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
/// Best-effort teardown budget once either pump finishes.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Close code sent when the inner side cannot be reached or rejects.
const GOING_AWAY: u16 = 1001;

type InnerWs = WebSocketStream<TcpStream>;

/// Handle a WebSocket upgrade aimed at a running app.
///
/// The inner handshake happens *before* the outer `101` goes out, so the
/// outer accept can carry the subprotocol the app actually selected.
pub(crate) async fn handle(record: AppRecord, req: Request<Body>) -> Response<Body> {
    let (mut parts, _body) = req.into_parts();
    let upgrade = match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
        Ok(upgrade) => upgrade,
        Err(rejection) => return rejection.into_response(),
    };

    let port = record.websocket_port();
    let stripped = strip_app_prefix(parts.uri.path(), &record.name);
    let target = match parts.uri.query() {
        Some(query) => format!("ws://127.0.0.1:{port}{stripped}?{query}"),
        None => format!("ws://127.0.0.1:{port}{stripped}"),
    };
    let offered = parts.headers.get(SEC_WEBSOCKET_PROTOCOL).cloned();

    // 5 s TCP connect, then 10 s for the upgrade exchange itself
    let stream = match timeout(CONNECT_TIMEOUT, TcpStream::connect(("127.0.0.1", port))).await {
        Ok(Ok(stream)) => stream,
        _ => {
            warn!(app = %record.name, port, "ws connect failed");
            return refuse(upgrade, "App port unreachable");
        }
    };

    let request = match build_inner_request(&target, offered.as_ref()) {
        Ok(request) => request,
        Err(e) => {
            warn!(app = %record.name, %target, error = %e, "bad ws target");
            return refuse(upgrade, "App port unreachable");
        }
    };

    let (inner, accept) =
        match timeout(HANDSHAKE_TIMEOUT, tokio_tungstenite::client_async(request, stream)).await {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => {
                warn!(app = %record.name, error = %e, "ws handshake rejected");
                return refuse(upgrade, "App refused WebSocket handshake");
            }
            Err(_) => {
                warn!(app = %record.name, "ws handshake timed out");
                return refuse(upgrade, "App WebSocket handshake timed out");
            }
        };

    // Echo the app's chosen subprotocol on the outer accept
    let upgrade = match accept
        .headers()
        .get(SEC_WEBSOCKET_PROTOCOL)
        .and_then(|value| value.to_str().ok())
    {
        Some(subprotocol) => upgrade.protocols([subprotocol.to_string()]),
        None => upgrade,
    };

    let name = record.name;
    upgrade.on_upgrade(move |outer| async move {
        pump(&name, outer, inner).await;
    })
}

/// Build the client-side handshake request, forwarding offered subprotocols.
fn build_inner_request(
    target: &str,
    offered: Option<&HeaderValue>,
) -> Result<tokio_tungstenite::tungstenite::handshake::client::Request, tokio_tungstenite::tungstenite::Error> {
    let mut request = target.into_client_request()?;
    if let Some(protocols) = offered {
        request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, protocols.clone());
    }
    Ok(request)
}

/// Accept the outer socket just to close it with 1001 and a reason.
fn refuse(upgrade: WebSocketUpgrade, reason: &'static str) -> Response<Body> {
    upgrade.on_upgrade(move |mut outer| async move {
        let frame = CloseFrame { code: GOING_AWAY, reason: reason.into() };
        let _ = outer.send(WsMessage::Close(Some(frame))).await;
    })
}

/// Bidirectional frame pump. Returns when either side finishes; the other
/// direction is cancelled and both ends get a best-effort close.
async fn pump(name: &str, outer: WebSocket, inner: InnerWs) {
    let (mut outer_tx, mut outer_rx) = outer.split();
    let (inner_tx, mut inner_rx) = inner.split();
    // Both directions write inner-bound frames (data one way, pong replies
    // the other), so the sink sits behind an async mutex held per send.
    let inner_tx = tokio::sync::Mutex::new(inner_tx);

    let outer_to_inner = async {
        while let Some(message) = outer_rx.next().await {
            let message = match message {
                Ok(message) => message,
                Err(_) => break,
            };
            match message {
                WsMessage::Text(text) => {
                    if inner_tx.lock().await.send(InnerMessage::text(text.to_string())).await.is_err()
                    {
                        break;
                    }
                }
                WsMessage::Binary(bytes) => {
                    if inner_tx.lock().await.send(InnerMessage::Binary(bytes)).await.is_err() {
                        break;
                    }
                }
                WsMessage::Close(frame) => {
                    // Forward the client-supplied code, default 1000
                    let inner_frame = frame.map(|f| InnerCloseFrame {
                        code: CloseCode::from(f.code),
                        reason: f.reason.as_str().to_string().into(),
                    });
                    let _ = inner_tx.lock().await.send(InnerMessage::Close(inner_frame)).await;
                    break;
                }
                // The outer endpoint answers pings itself
                WsMessage::Ping(_) | WsMessage::Pong(_) => {}
            }
        }
    };

    let inner_to_outer = async {
        while let Some(message) = inner_rx.next().await {
            let message = match message {
                Ok(message) => message,
                Err(_) => break,
            };
            match message {
                InnerMessage::Text(text) => {
                    if outer_tx.send(WsMessage::Text(text.as_str().into())).await.is_err() {
                        break;
                    }
                }
                InnerMessage::Binary(bytes) => {
                    if outer_tx.send(WsMessage::Binary(bytes)).await.is_err() {
                        break;
                    }
                }
                InnerMessage::Ping(payload) => {
                    // Answer the app directly; pings never reach the outer client
                    let _ = inner_tx.lock().await.send(InnerMessage::Pong(payload)).await;
                }
                InnerMessage::Pong(_) => {}
                InnerMessage::Close(frame) => {
                    let outer_frame = frame.map(|f| CloseFrame {
                        code: f.code.into(),
                        reason: f.reason.as_str().into(),
                    });
                    let _ = outer_tx.send(WsMessage::Close(outer_frame)).await;
                    break;
                }
                InnerMessage::Frame(_) => {}
            }
        }
    };

    tokio::select! {
        _ = outer_to_inner => debug!(app = name, "outer side finished"),
        _ = inner_to_outer => debug!(app = name, "inner side finished"),
    }

    // Cancel the surviving direction implicitly (select dropped it) and
    // tear both file descriptors down within a bounded drain.
    let _ = timeout(DRAIN_TIMEOUT, async {
        let _ = inner_tx.lock().await.close().await;
        let _ = outer_tx.close().await;
    })
    .await;
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;
