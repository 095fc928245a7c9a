// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Core-app seeding at supervisor boot.
//!
//! Seeds `shared-browser` and `shared-terminal` into the registry on every
//! boot: inserted with autostart when absent, repaired (missing `ws_port`,
//! `autostart`, `core` flags) when present. Their `pid`/`status` are reset
//! unconditionally — even a PID that looks alive may belong to an unrelated
//! process after a container restart.

use std::collections::HashMap;

use tracing::info;

use dh_core::{AppRecord, AppStatus, Clock};
use dh_registry::{Registry, RegistryError};

struct CoreSeed {
    name: &'static str,
    port: u16,
    ws_port: Option<u16>,
    cmd: &'static str,
    description: &'static str,
}

const SEEDS: &[CoreSeed] = &[
    CoreSeed {
        name: "shared-browser",
        port: 9003,
        // noVNC websockify backend
        ws_port: Some(6081),
        cmd: "bash startup.sh",
        description: "Shared Browser — Collaborative browser instance",
    },
    CoreSeed {
        name: "shared-terminal",
        port: 9004,
        // exec so the tracked PID is ttyd itself, not the wrapper shell
        cmd: "exec bash startup.sh",
        ws_port: None,
        description: "Shared Terminal — Persistent tmux session",
    },
];

/// Seed or repair the core apps and reset their process state.
pub fn seed_core_apps<C: Clock>(registry: &Registry, clock: &C) -> Result<(), RegistryError> {
    for seed in SEEDS {
        if registry.is_registered(seed.name)? {
            registry.update(seed.name, |app| {
                if app.ws_port.is_none() {
                    app.ws_port = seed.ws_port;
                }
                app.autostart = true;
                app.core = true;
                // Unconditional reset: the app is never running at boot
                app.status = AppStatus::Registered;
                app.pid = None;
            })?;
            info!(app = seed.name, "core app repaired");
        } else {
            registry.insert(AppRecord {
                name: seed.name.to_string(),
                port: seed.port,
                ws_port: seed.ws_port,
                cmd: seed.cmd.to_string(),
                cwd: registry.apps_dir().join(seed.name),
                description: seed.description.to_string(),
                env: HashMap::new(),
                autostart: true,
                core: true,
                status: AppStatus::Registered,
                pid: None,
                created_at: clock.now_utc(),
                started_at: None,
                url: format!("/{}/", seed.name),
                extra: serde_json::Map::new(),
            })?;
            info!(app = seed.name, port = seed.port, "core app seeded");
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "seed_tests.rs"]
mod tests;
