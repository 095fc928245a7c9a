// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket tunnel specs against a hand-rolled RFC 6455 server.
//!
//! The inner side is a raw TCP listener speaking just enough of the
//! protocol to control framing byte-for-byte — in particular, to put a data
//! frame into the same TCP segment as the `101 Switching Protocols`.

use crate::prelude::*;

use base64::Engine;
use futures_util::StreamExt;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;

const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

fn accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

/// Read the HTTP request head (through the blank line) as a string.
async fn read_request_head(stream: &mut TcpStream) -> String {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        stream.read_exact(&mut byte).await.unwrap();
        head.push(byte[0]);
    }
    String::from_utf8(head).unwrap()
}

fn header_value<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    head.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
    })
}

fn handshake_response(head: &str, subprotocol: Option<&str>) -> Vec<u8> {
    let key = header_value(head, "Sec-WebSocket-Key").unwrap();
    let mut response = format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n",
        accept_key(key)
    );
    if let Some(proto) = subprotocol {
        response.push_str(&format!("Sec-WebSocket-Protocol: {proto}\r\n"));
    }
    response.push_str("\r\n");
    response.into_bytes()
}

/// Server-to-client frame (unmasked); payload must stay under 126 bytes.
fn frame(opcode: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0x80 | opcode, payload.len() as u8];
    out.extend_from_slice(payload);
    out
}

fn text_frame(payload: &str) -> Vec<u8> {
    frame(0x1, payload.as_bytes())
}

fn ping_frame(payload: &[u8]) -> Vec<u8> {
    frame(0x9, payload)
}

fn close_frame(code: u16) -> Vec<u8> {
    frame(0x8, &code.to_be_bytes())
}

/// Read one masked client-to-server frame; returns (opcode, payload).
async fn read_client_frame(stream: &mut TcpStream) -> (u8, Vec<u8>) {
    let mut header = [0u8; 2];
    stream.read_exact(&mut header).await.unwrap();
    let opcode = header[0] & 0x0F;
    let masked = header[1] & 0x80 != 0;
    let mut len = (header[1] & 0x7F) as usize;
    if len == 126 {
        let mut ext = [0u8; 2];
        stream.read_exact(&mut ext).await.unwrap();
        len = u16::from_be_bytes(ext) as usize;
    }
    let mask = if masked {
        let mut mask = [0u8; 4];
        stream.read_exact(&mut mask).await.unwrap();
        mask
    } else {
        [0u8; 4]
    };
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await.unwrap();
    if masked {
        for (i, byte) in payload.iter_mut().enumerate() {
            *byte ^= mask[i % 4];
        }
    }
    (opcode, payload)
}

/// Spawn an inner server whose connection handling is the given script.
async fn spawn_inner<F, Fut>(script: F) -> u16
where
    F: FnOnce(TcpStream, String) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let head = read_request_head(&mut stream).await;
        script(stream, head).await;
    });
    port
}

#[tokio::test]
async fn data_frame_in_the_101_segment_is_not_lost() {
    let inner = spawn_inner(|mut stream, head| async move {
        // 101 and the first data frame in ONE write — same TCP segment
        let mut burst = handshake_response(&head, None);
        burst.extend_from_slice(&text_frame("early-bird"));
        stream.write_all(&burst).await.unwrap();
        stream.flush().await.unwrap();

        // Keep the socket open until the client has read everything
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    })
    .await;

    let gateway = TestGateway::start().await;
    gateway.plant_running("demo", inner, None);

    let (mut ws, _) =
        tokio_tungstenite::connect_async(format!("{}/demo/", gateway.ws_base())).await.unwrap();
    let message = tokio::time::timeout(std::time::Duration::from_secs(5), ws.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(message, Message::text("early-bird"));
}

#[tokio::test]
async fn upstream_ping_is_answered_not_forwarded() {
    let inner = spawn_inner(|mut stream, head| async move {
        stream.write_all(&handshake_response(&head, None)).await.unwrap();

        stream.write_all(&ping_frame(b"hb")).await.unwrap();

        // The proxy must answer with a pong carrying the same payload
        loop {
            let (opcode, payload) = read_client_frame(&mut stream).await;
            if opcode == 0xA {
                assert_eq!(payload, b"hb");
                break;
            }
        }

        stream.write_all(&text_frame("after-ping")).await.unwrap();
        stream.write_all(&close_frame(1000)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    })
    .await;

    let gateway = TestGateway::start().await;
    gateway.plant_running("demo", inner, None);

    let (mut ws, _) =
        tokio_tungstenite::connect_async(format!("{}/demo/", gateway.ws_base())).await.unwrap();

    let mut texts = Vec::new();
    while let Some(Ok(message)) = ws.next().await {
        match message {
            Message::Text(text) => texts.push(text.to_string()),
            Message::Ping(_) => panic!("upstream ping leaked to the outer client"),
            Message::Close(frame) => {
                assert_eq!(frame.map(|f| u16::from(f.code)), Some(1000));
                break;
            }
            _ => {}
        }
    }
    assert_eq!(texts, vec!["after-ping".to_string()]);
}

#[tokio::test]
async fn ws_port_takes_precedence_over_the_http_port() {
    let inner = spawn_inner(|mut stream, head| async move {
        stream.write_all(&handshake_response(&head, None)).await.unwrap();
        stream.write_all(&text_frame("via-ws-port")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    })
    .await;

    // HTTP port points nowhere; only ws_port is real
    let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let closed = probe.local_addr().unwrap().port();
    drop(probe);

    let gateway = TestGateway::start().await;
    gateway.plant_running("vnc", closed, Some(inner));

    let (mut ws, _) =
        tokio_tungstenite::connect_async(format!("{}/vnc/", gateway.ws_base())).await.unwrap();
    let message = tokio::time::timeout(std::time::Duration::from_secs(5), ws.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(message, Message::text("via-ws-port"));
}

#[tokio::test]
async fn subprotocol_is_negotiated_end_to_end() {
    let inner = spawn_inner(|mut stream, head| async move {
        // The app picks the first offered subprotocol
        let offered = header_value(&head, "Sec-WebSocket-Protocol").unwrap().to_string();
        let chosen = offered.split(',').next().unwrap().trim().to_string();
        stream.write_all(&handshake_response(&head, Some(&chosen))).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    })
    .await;

    let gateway = TestGateway::start().await;
    gateway.plant_running("demo", inner, None);

    let mut request =
        format!("{}/demo/", gateway.ws_base()).into_client_request().unwrap();
    request.headers_mut().insert(
        "Sec-WebSocket-Protocol",
        "binary, base64".parse().unwrap(),
    );
    let (_ws, response) = tokio_tungstenite::connect_async(request).await.unwrap();
    assert_eq!(
        response.headers().get("Sec-WebSocket-Protocol").map(|v| v.to_str().unwrap()),
        Some("binary")
    );
}

#[tokio::test]
async fn outer_close_code_reaches_the_app() {
    let (code_tx, code_rx) = tokio::sync::oneshot::channel();
    let inner = spawn_inner(move |mut stream, head| async move {
        stream.write_all(&handshake_response(&head, None)).await.unwrap();
        loop {
            let (opcode, payload) = read_client_frame(&mut stream).await;
            if opcode == 0x8 {
                let code = u16::from_be_bytes([payload[0], payload[1]]);
                let _ = code_tx.send(code);
                break;
            }
        }
    })
    .await;

    let gateway = TestGateway::start().await;
    gateway.plant_running("demo", inner, None);

    let (mut ws, _) =
        tokio_tungstenite::connect_async(format!("{}/demo/", gateway.ws_base())).await.unwrap();
    ws.close(Some(tokio_tungstenite::tungstenite::protocol::CloseFrame {
        code: 3001.into(),
        reason: "done".into(),
    }))
    .await
    .unwrap();

    let code = tokio::time::timeout(std::time::Duration::from_secs(5), code_rx)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(code, 3001);
}

#[tokio::test]
async fn unreachable_ws_port_closes_with_1001() {
    let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let closed = probe.local_addr().unwrap().port();
    drop(probe);

    let gateway = TestGateway::start().await;
    gateway.plant_running("gone", closed, None);

    let (mut ws, _) =
        tokio_tungstenite::connect_async(format!("{}/gone/", gateway.ws_base())).await.unwrap();
    let message = tokio::time::timeout(std::time::Duration::from_secs(10), ws.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    match message {
        Message::Close(Some(frame)) => {
            assert_eq!(u16::from(frame.code), 1001);
            assert_eq!(frame.reason.as_str(), "App port unreachable");
        }
        other => panic!("expected close, got {other:?}"),
    }
}

#[tokio::test]
async fn stopped_app_never_reaches_the_tunnel() {
    let gateway = TestGateway::start().await;
    gateway
        .supervisor
        .registry()
        .insert(record("idle", 9000, None, dh_core::AppStatus::Stopped, None))
        .unwrap();

    // The upgrade is refused with an HTTP error, not a WebSocket close
    let result =
        tokio_tungstenite::connect_async(format!("{}/idle/", gateway.ws_base())).await;
    assert!(result.is_err());
}
