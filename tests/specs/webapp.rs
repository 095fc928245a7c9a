// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! REST-surface specs, driven over the wire.

use crate::prelude::*;

use serde_json::json;

#[tokio::test]
async fn register_reports_the_new_record_and_url() {
    let gateway = TestGateway::start().await;
    let client = http_client();

    let value = post_webapp(
        &client,
        &gateway.base,
        json!({
            "action": "register",
            "name": "demo",
            "port": 9000,
            "cmd": "python app.py",
            "cwd": "/tmp/demo",
        }),
    )
    .await;

    assert_eq!(value["app"]["status"], "registered");
    assert_eq!(value["app"]["pid"], serde_json::Value::Null);
    assert_eq!(value["app"]["port"], 9000);
    assert_eq!(value["url"], "/demo/");
}

#[tokio::test]
async fn alloc_port_returns_the_next_free_port() {
    let gateway = TestGateway::start().await;
    let client = http_client();

    post_webapp(
        &client,
        &gateway.base,
        json!({
            "action": "register", "name": "demo", "port": 9000,
            "cmd": "python app.py", "cwd": "/tmp/demo",
        }),
    )
    .await;

    let value = post_webapp(&client, &gateway.base, json!({ "action": "alloc_port" })).await;
    assert_eq!(value["port"], 9001);
}

#[tokio::test]
async fn alloc_port_skips_ports_of_apps_that_never_ran() {
    let gateway = TestGateway::start().await;
    let client = http_client();

    for (name, port) in [("first", 9000), ("second", 9000)] {
        post_webapp(
            &client,
            &gateway.base,
            json!({
                "action": "register", "name": name, "port": port,
                "cmd": "python app.py", "cwd": format!("/tmp/{name}"),
            }),
        )
        .await;
    }

    // 9000 is taken (twice over, even); the allocator must not choose it
    let value = post_webapp(&client, &gateway.base, json!({ "action": "alloc_port" })).await;
    assert_eq!(value["port"], 9001);
}

#[tokio::test]
async fn core_apps_cannot_be_removed_over_the_wire() {
    let gateway = TestGateway::start().await;
    let client = http_client();

    post_webapp(
        &client,
        &gateway.base,
        json!({
            "action": "register", "name": "shared-browser", "port": 9003,
            "cmd": "bash startup.sh", "cwd": "/tmp/shared-browser", "core": true,
        }),
    )
    .await;

    let value = post_webapp(
        &client,
        &gateway.base,
        json!({ "action": "remove", "name": "shared-browser" }),
    )
    .await;
    assert!(value["error"].as_str().unwrap().contains("Cannot remove core app"));

    // Still there
    let status = get_webapp(&client, &gateway.base, "action=status&name=shared-browser").await;
    assert_eq!(status["app"]["name"], "shared-browser");
}

#[tokio::test]
async fn list_includes_apps_dir() {
    let gateway = TestGateway::start().await;
    let client = http_client();
    let value = get_webapp(&client, &gateway.base, "action=list").await;
    assert!(value["apps"].is_array());
    assert!(value["apps_dir"].is_string());
}

#[tokio::test]
async fn unknown_action_is_an_error_payload() {
    let gateway = TestGateway::start().await;
    let client = http_client();
    let value = post_webapp(&client, &gateway.base, json!({ "action": "explode" })).await;
    assert_eq!(value["error"], "Unknown action: explode");
}

#[tokio::test]
async fn reserved_names_cannot_be_registered() {
    let gateway = TestGateway::start().await;
    let client = http_client();
    let value = post_webapp(
        &client,
        &gateway.base,
        json!({
            "action": "register", "name": "webapp", "port": 9000,
            "cmd": "python app.py", "cwd": "/tmp/webapp",
        }),
    )
    .await;
    assert!(value["error"].as_str().unwrap().contains("reserved"));
}
