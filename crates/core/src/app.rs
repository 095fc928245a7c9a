// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry record for a managed local web app.
//!
//! An `AppRecord` is the unit of persistent registry state: one record per
//! app name, serialised as a JSON object in the registry file. Fields this
//! version doesn't know about are preserved across a load/save round-trip
//! so newer registry files stay readable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Lifecycle status of a registered app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppStatus {
    /// Registered but never started (or reset at boot)
    Registered,
    /// Process believed alive; `pid` is set
    Running,
    /// Process stopped or found dead; `pid` is cleared
    Stopped,
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registered => write!(f, "registered"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// One registered app: the URL prefix, inner port, spawn command and
/// process bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppRecord {
    /// Unique name; doubles as the URL path prefix
    pub name: String,
    /// Inner HTTP port
    pub port: u16,
    /// Separate WebSocket port; frames tunnel here instead of `port` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_port: Option<u16>,
    /// Shell command line, interpreted by `sh -c`
    pub cmd: String,
    /// Working directory, created before spawn if missing
    pub cwd: PathBuf,
    #[serde(default)]
    pub description: String,
    /// Extra environment merged over the parent environment at spawn
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Started automatically at supervisor boot
    #[serde(default)]
    pub autostart: bool,
    /// Core apps cannot be removed (they may be stopped)
    #[serde(default)]
    pub core: bool,
    pub status: AppStatus,
    /// Process-group-leader PID while running
    pub pid: Option<i32>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Outer URL prefix, `/{name}/`
    pub url: String,
    /// Fields from newer versions, preserved verbatim on round-trip
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AppRecord {
    /// True when the record claims a live process.
    pub fn is_running(&self) -> bool {
        self.status == AppStatus::Running
    }

    /// The port WebSocket frames tunnel to.
    pub fn websocket_port(&self) -> u16 {
        self.ws_port.unwrap_or(self.port)
    }

    /// Clear process state, leaving the registration intact.
    pub fn mark_stopped(&mut self) {
        self.status = AppStatus::Stopped;
        self.pid = None;
    }
}

#[cfg(test)]
#[path = "app_tests.rs"]
mod tests;
