// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gateway startup: lock, registry, boot recovery, serve.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use fs2::FileExt;
use thiserror::Error;
use tracing::info;

use dh_registry::{Registry, RegistryError};
use dh_supervisor::{Supervisor, SupervisorError};

use crate::router::{router, GatewayState};

/// Lock file name, inside the apps directory. One gateway per apps dir.
const LOCK_FILE: &str = ".dhd.lock";

/// Gateway configuration, resolved from the environment by `main`.
#[derive(Debug, Clone)]
pub struct Config {
    pub apps_dir: PathBuf,
    pub bind_host: String,
    pub outer_port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            apps_dir: crate::env::apps_dir(),
            bind_host: crate::env::bind_host(),
            outer_port: crate::env::outer_port(),
        }
    }
}

/// Errors from gateway startup.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Another gateway already owns {0} (lock held)")]
    LockFailed(PathBuf),

    #[error("Failed to bind {addr}: {source}")]
    BindFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A booted gateway, not yet serving.
pub struct Started {
    pub state: Arc<GatewayState>,
    pub listener: tokio::net::TcpListener,
    /// Held for the process lifetime; dropping releases the apps dir.
    pub lock_file: std::fs::File,
    /// Apps started by `autostart_all` during boot.
    pub autostarted: Vec<String>,
}

/// Boot the supervisor and bind the outer listener.
///
/// Order matters: the lock is taken first so a second gateway cannot race
/// boot recovery; the listener binds last, only after the registry and
/// seeds are in place.
pub async fn startup(config: &Config) -> Result<Started, GatewayError> {
    std::fs::create_dir_all(&config.apps_dir)?;

    // Open without truncating — the file may hold the running owner's PID
    let lock_path = config.apps_dir.join(LOCK_FILE);
    let mut lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(|_| GatewayError::LockFailed(lock_path.clone()))?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    let registry = Arc::new(Registry::open(&config.apps_dir)?);
    let supervisor = Arc::new(Supervisor::new(registry));
    let autostarted = supervisor.boot().await?;
    if !autostarted.is_empty() {
        info!(apps = ?autostarted, "autostarted");
    }

    let addr = format!("{}:{}", config.bind_host, config.outer_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| GatewayError::BindFailed { addr: addr.clone(), source })?;
    info!(%addr, apps_dir = %config.apps_dir.display(), "gateway listening");

    Ok(Started {
        state: Arc::new(GatewayState { supervisor }),
        listener,
        lock_file,
        autostarted,
    })
}

/// Boot and serve until the process is stopped.
pub async fn run(config: Config) -> Result<(), GatewayError> {
    let started = startup(&config).await?;
    let app = router(Arc::clone(&started.state));
    axum::serve(started.listener, app).await?;
    Ok(())
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
