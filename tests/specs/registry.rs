// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry persistence and boot-recovery specs.

use crate::prelude::*;

use dh_core::{AppStatus, SystemClock};
use dh_registry::{Registry, REGISTRY_FILE};
use dh_supervisor::seed_core_apps;

#[test]
fn ports_stay_unique_across_allocation() {
    let dir = tempfile::tempdir().unwrap();
    let registry = std::sync::Arc::new(Registry::open(dir.path()).unwrap());
    let allocator = dh_registry::PortAllocator::default();

    // Allocate-register in a loop; every port handed out must be fresh
    let mut seen = std::collections::HashSet::new();
    for i in 0..10 {
        let port = registry.allocate_port(&allocator).unwrap();
        assert!(seen.insert(port), "port {port} handed out twice");
        registry
            .insert(record(&format!("app{i}"), port, None, AppStatus::Registered, None))
            .unwrap();
    }

    // And the registry agrees: pairwise-distinct ports
    let apps = registry.list().unwrap();
    let ports: std::collections::HashSet<u16> = apps.iter().map(|a| a.port).collect();
    assert_eq!(ports.len(), apps.len());
}

#[test]
fn round_trip_yields_the_same_parsed_map() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Registry::open(dir.path()).unwrap();
    registry.insert(record("demo", 9000, None, AppStatus::Registered, None)).unwrap();
    let mut dash = record("dash", 9001, Some(6081), AppStatus::Stopped, None);
    dash.description = "Dash — dashboard".to_string();
    dash.env.insert("FLASK_ENV".to_string(), "production".to_string());
    dash.extra.insert("added_by_v2".to_string(), serde_json::json!({"keep": true}));
    registry.insert(dash).unwrap();
    drop(registry);

    let file = dir.path().join(REGISTRY_FILE);
    let before: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&file).unwrap()).unwrap();

    // Reopen and rewrite through a no-op mutation
    let reopened = Registry::open(dir.path()).unwrap();
    reopened.update("demo", |_| {}).unwrap();

    let after: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&file).unwrap()).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn register_start_stop_keeps_the_record() {
    let dir = tempfile::tempdir().unwrap();
    let registry = std::sync::Arc::new(Registry::open(dir.path()).unwrap());
    let supervisor = dh_supervisor::Supervisor::new(registry);

    supervisor
        .register_app(dh_supervisor::RegisterApp {
            name: "demo".to_string(),
            port: 9000,
            cmd: "sleep 30".to_string(),
            ..Default::default()
        })
        .unwrap();
    supervisor.start_app("demo").await.unwrap();
    let stopped = supervisor.stop_app("demo").await.unwrap();

    assert_eq!(stopped.status, AppStatus::Stopped);
    assert_eq!(stopped.pid, None);
    assert!(supervisor.registry().is_registered("demo").unwrap());
}

#[test]
fn boot_recovery_resets_core_apps_with_live_looking_pids() {
    // A previous container lifetime stored PIDs that, on this host, belong
    // to unrelated live processes. Seeding must reset them regardless, so
    // autostart isn't skipped.
    let dir = tempfile::tempdir().unwrap();
    {
        let registry = Registry::open(dir.path()).unwrap();
        seed_core_apps(&registry, &SystemClock).unwrap();
        for name in ["shared-browser", "shared-terminal"] {
            registry
                .update(name, |app| {
                    app.status = AppStatus::Running;
                    app.pid = Some(std::process::id() as i32);
                })
                .unwrap();
        }
    }

    let registry = Registry::open(dir.path()).unwrap();
    seed_core_apps(&registry, &SystemClock).unwrap();
    for app in registry.list().unwrap() {
        assert_ne!(app.status, AppStatus::Running, "{} still running", app.name);
        assert_eq!(app.pid, None, "{} kept its stale pid", app.name);
    }
}

#[tokio::test]
async fn externally_killed_app_reads_stopped_within_one_poll() {
    let gateway = TestGateway::start().await;
    let client = http_client();

    post_webapp(
        &client,
        &gateway.base,
        serde_json::json!({
            "action": "register", "name": "demo", "port": 9000, "cmd": "sleep 30",
        }),
    )
    .await;
    let started = post_webapp(
        &client,
        &gateway.base,
        serde_json::json!({ "action": "start", "name": "demo" }),
    )
    .await;
    let pid = started["app"]["pid"].as_i64().unwrap() as i32;

    nix::sys::signal::killpg(nix::unistd::Pid::from_raw(pid), nix::sys::signal::Signal::SIGKILL)
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_secs(1)).await;

    let status = get_webapp(&client, &gateway.base, "action=status&name=demo").await;
    assert_eq!(status["app"]["status"], "stopped");
    assert_eq!(status["app"]["pid"], serde_json::Value::Null);
}
