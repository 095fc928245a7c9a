// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! App lifecycle operations.
//!
//! All mutating operations serialise on the supervisor's own async mutex;
//! the SIGTERM/SIGKILL grace sleeps run while it is held, which is fine at
//! app-lifecycle frequency. The registry keeps its own short-section lock
//! underneath and persists on every mutation.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use dh_core::{validate_name, AppRecord, AppStatus, Clock, DrawerState, SystemClock};
use dh_registry::{pid_alive, PortAllocator, Registry};

use crate::error::SupervisorError;
use crate::probe;
use crate::process::{spawn_shell, terminate_group};
use crate::seed::seed_core_apps;

/// Grace period before SIGKILL when replacing a still-running process.
const START_KILL_GRACE: Duration = Duration::from_secs(1);
/// Grace period before SIGKILL on an explicit stop.
const STOP_KILL_GRACE: Duration = Duration::from_secs(2);
/// Pause between stop and start inside a restart.
const RESTART_PAUSE: Duration = Duration::from_secs(1);

/// Arguments to `register_app`. Optional fields mirror the REST surface:
/// `cwd` defaults to `{apps_dir}/{name}`.
#[derive(Debug, Clone, Default)]
pub struct RegisterApp {
    pub name: String,
    pub port: u16,
    pub cmd: String,
    pub cwd: Option<PathBuf>,
    pub description: String,
    pub env: HashMap<String, String>,
    pub autostart: bool,
    pub core: bool,
    pub ws_port: Option<u16>,
}

/// Readiness of an app's service port after `open_app`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppReadiness {
    /// The probed port accepted a connection
    Ready,
    /// The probe timed out; the app may still be starting
    NotReady,
    /// No probe configured for this app
    NotProbed,
}

/// Result of `open_app`: the (possibly freshly started) record plus the
/// outcome of any readiness probe.
#[derive(Debug, Clone)]
pub struct OpenedApp {
    pub record: AppRecord,
    pub readiness: AppReadiness,
}

/// Spawns, stops and restarts inner apps against the persistent registry.
pub struct Supervisor<C: Clock = SystemClock> {
    registry: Arc<Registry>,
    allocator: PortAllocator,
    clock: C,
    drawer: Mutex<DrawerState>,
    ops: AsyncMutex<()>,
}

impl Supervisor<SystemClock> {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_clock(registry, SystemClock)
    }
}

impl<C: Clock> Supervisor<C> {
    pub fn with_clock(registry: Arc<Registry>, clock: C) -> Self {
        Self {
            registry,
            allocator: PortAllocator::default(),
            clock,
            drawer: Mutex::new(DrawerState::default()),
            ops: AsyncMutex::new(()),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Next free inner port, or `PortExhausted`.
    pub fn next_available_port(&self) -> Result<u16, SupervisorError> {
        Ok(self.registry.allocate_port(&self.allocator)?)
    }

    /// Boot-time recovery and autostart.
    ///
    /// Core apps get their `pid`/`status` reset unconditionally — a PID
    /// stored by a previous container lifetime may have been reused by an
    /// unrelated process, which would fool the dead-PID scrub. Then the
    /// core seeds are written, stale PIDs scrubbed, and autostart runs.
    pub async fn boot(&self) -> Result<Vec<String>, SupervisorError> {
        seed_core_apps(&self.registry, &self.clock)?;
        self.registry.cleanup_dead()?;
        *self.drawer.lock() = DrawerState::default();
        Ok(self.autostart_all().await)
    }

    /// Create or overwrite a registration. Does not start the app.
    pub fn register_app(&self, spec: RegisterApp) -> Result<AppRecord, SupervisorError> {
        validate_name(&spec.name)?;
        let cwd = spec
            .cwd
            .unwrap_or_else(|| self.registry.apps_dir().join(&spec.name));
        let record = AppRecord {
            url: format!("/{}/", spec.name),
            name: spec.name,
            port: spec.port,
            ws_port: spec.ws_port,
            cmd: spec.cmd,
            cwd,
            description: spec.description,
            env: spec.env,
            autostart: spec.autostart,
            core: spec.core,
            status: AppStatus::Registered,
            pid: None,
            created_at: self.clock.now_utc(),
            started_at: None,
            extra: serde_json::Map::new(),
        };
        info!(app = %record.name, port = record.port, "registered");
        Ok(self.registry.insert(record)?)
    }

    /// Start a registered app as a background process.
    pub async fn start_app(&self, name: &str) -> Result<AppRecord, SupervisorError> {
        let _guard = self.ops.lock().await;
        self.start_locked(name).await
    }

    /// Stop a running app. Clears `pid` even if the process was already gone.
    pub async fn stop_app(&self, name: &str) -> Result<AppRecord, SupervisorError> {
        let _guard = self.ops.lock().await;
        self.stop_locked(name).await
    }

    /// Stop, pause, start.
    pub async fn restart_app(&self, name: &str) -> Result<AppRecord, SupervisorError> {
        let _guard = self.ops.lock().await;
        self.stop_locked(name).await?;
        tokio::time::sleep(RESTART_PAUSE).await;
        self.start_locked(name).await
    }

    /// Stop and unregister an app. Core apps cannot be removed.
    /// Returns true iff a record was deleted.
    pub async fn remove_app(&self, name: &str) -> Result<bool, SupervisorError> {
        let _guard = self.ops.lock().await;
        let Some(record) = self.registry.get(name)? else {
            return Ok(false);
        };
        if record.core {
            return Err(SupervisorError::CoreApp(name.to_string()));
        }
        // Best-effort stop; a failure here must not keep the record around
        if let Err(e) = self.stop_locked(name).await {
            warn!(app = name, error = %e, "stop before remove failed");
        }
        info!(app = name, "removed");
        Ok(self.registry.remove(name)?)
    }

    /// Enable or disable autostart for a registered app.
    pub fn set_autostart(&self, name: &str, enabled: bool) -> Result<AppRecord, SupervisorError> {
        let record = self
            .registry
            .update(name, |app| app.autostart = enabled)
            .map_err(unknown_app)?;
        Ok(record)
    }

    /// Start every app with `autostart` that isn't already running.
    /// Individual failures are logged, not fatal.
    pub async fn autostart_all(&self) -> Vec<String> {
        let apps = match self.registry.list() {
            Ok(apps) => apps,
            Err(e) => {
                warn!(error = %e, "autostart skipped: registry unreadable");
                return Vec::new();
            }
        };

        let mut started = Vec::new();
        for app in apps {
            if !app.autostart || app.is_running() {
                continue;
            }
            match self.start_app(&app.name).await {
                Ok(_) => started.push(app.name),
                Err(e) => warn!(app = %app.name, error = %e, "autostart failed"),
            }
        }
        started
    }

    async fn start_locked(&self, name: &str) -> Result<AppRecord, SupervisorError> {
        let record = self
            .registry
            .get(name)?
            .ok_or_else(|| SupervisorError::UnknownApp(name.to_string()))?;

        // Kill a leftover process before replacing it
        if let Some(pid) = record.pid {
            if pid_alive(pid) {
                terminate_group(pid, START_KILL_GRACE).await;
            }
        }

        std::fs::create_dir_all(&record.cwd)?;

        let mut env = record.env.clone();
        env.insert("PORT".to_string(), record.port.to_string());
        // Used by templates for <base href="/APP_NAME/">
        env.insert("APP_NAME".to_string(), record.name.clone());

        let pid = spawn_shell(&record.cmd, &record.cwd, &env)
            .map_err(|source| SupervisorError::Spawn { name: name.to_string(), source })?;

        let started_at = self.clock.now_utc();
        let record = self.registry.update(name, |app| {
            app.pid = Some(pid);
            app.status = AppStatus::Running;
            app.started_at = Some(started_at);
        })?;
        info!(app = name, pid, port = record.port, "started");
        Ok(record)
    }

    async fn stop_locked(&self, name: &str) -> Result<AppRecord, SupervisorError> {
        let record = self
            .registry
            .get(name)?
            .ok_or_else(|| SupervisorError::UnknownApp(name.to_string()))?;

        if let Some(pid) = record.pid {
            terminate_group(pid, STOP_KILL_GRACE).await;
        }

        let record = self.registry.update(name, AppRecord::mark_stopped)?;
        info!(app = name, "stopped");
        Ok(record)
    }

    // ── Drawer coordination ─────────────────────────────────────────────
    //
    // The drawer is volatile UI state shared by the agent and the human.
    // Writers race on it; the last one wins.

    /// Current tab-strip state.
    pub fn drawer_state(&self) -> DrawerState {
        self.drawer.lock().clone()
    }

    /// Open an app as a drawer tab, starting it if necessary. For the core
    /// apps, also wait for their service port so the next tool call doesn't
    /// race a still-starting process.
    pub async fn open_app(&self, name: &str) -> Result<OpenedApp, SupervisorError> {
        let record = self
            .registry
            .get(name)?
            .ok_or_else(|| SupervisorError::UnknownApp(name.to_string()))?;

        let record = if record.is_running() { record } else { self.start_app(name).await? };

        self.drawer.lock().open_tab(name);

        let readiness = match name {
            "shared-browser" => {
                let ready = probe::wait_for_port(
                    "127.0.0.1",
                    probe::SHARED_BROWSER_CDP_PORT,
                    probe::SHARED_BROWSER_CDP_WAIT,
                )
                .await;
                if ready { AppReadiness::Ready } else { AppReadiness::NotReady }
            }
            "shared-terminal" => {
                let ready = probe::wait_for_port(
                    "127.0.0.1",
                    record.port,
                    probe::SHARED_TERMINAL_HTTP_WAIT,
                )
                .await;
                if ready { AppReadiness::Ready } else { AppReadiness::NotReady }
            }
            _ => AppReadiness::NotProbed,
        };

        Ok(OpenedApp { record, readiness })
    }

    /// Hide the drawer; tabs remain.
    pub fn close_drawer(&self) {
        self.drawer.lock().close();
    }

    /// Remove a drawer tab.
    pub fn close_tab(&self, name: &str) {
        self.drawer.lock().close_tab(name);
    }
}

fn unknown_app(e: dh_registry::RegistryError) -> SupervisorError {
    match e {
        dh_registry::RegistryError::UnknownApp(name) => SupervisorError::UnknownApp(name),
        other => SupervisorError::Registry(other),
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
