// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/webapp` — the REST surface the agent drives the supervisor through.
//!
//! One endpoint, action-dispatched. POST takes a JSON body whose `action`
//! tag selects a typed variant; GET accepts the read-only actions via the
//! query string. CSRF is deliberately absent: the endpoint is meant for
//! programmatic, session-authenticated agent access.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use dh_supervisor::{RegisterApp, Supervisor};

fn default_true() -> bool {
    true
}

/// Action names the surface understands. Anything else is reported as
/// `Unknown action: ...`, distinct from a body that fails JSON validation.
const ACTION_NAMES: &[&str] = &[
    "list",
    "alloc_port",
    "status",
    "register",
    "start",
    "stop",
    "restart",
    "remove",
    "autostart",
];

/// One REST action. The open-ended string→any payload of old API versions
/// is gone: each variant carries exactly its own typed fields, and JSON
/// unmarshalling enforces the required ones.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum WebappAction {
    List,
    AllocPort,
    Status {
        name: String,
    },
    Register {
        name: String,
        port: u16,
        cmd: String,
        #[serde(default)]
        cwd: Option<PathBuf>,
        #[serde(default)]
        description: String,
        #[serde(default)]
        env: HashMap<String, String>,
        #[serde(default)]
        autostart: bool,
        #[serde(default)]
        core: bool,
        #[serde(default)]
        ws_port: Option<u16>,
    },
    Start {
        name: String,
    },
    Stop {
        name: String,
    },
    Restart {
        name: String,
    },
    Remove {
        name: String,
    },
    Autostart {
        name: String,
        #[serde(default = "default_true")]
        enabled: bool,
    },
}

impl WebappAction {
    /// True for actions GET may run (everything else needs a POST).
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::List | Self::Status { .. } | Self::AllocPort)
    }

    /// Build a read-only action from GET query parameters.
    /// Missing `action` means `list`, like the original surface.
    pub fn from_query(params: &HashMap<String, String>) -> Result<Self, String> {
        let action = params.get("action").map(String::as_str).unwrap_or("list");
        let name = || -> Result<String, String> {
            params
                .get("name")
                .filter(|name| !name.is_empty())
                .cloned()
                .ok_or_else(|| "name required".to_string())
        };
        match action {
            "list" => Ok(Self::List),
            "alloc_port" => Ok(Self::AllocPort),
            "status" => Ok(Self::Status { name: name()? }),
            other if ACTION_NAMES.contains(&other) => {
                Err(format!("Action '{other}' requires a POST"))
            }
            other => Err(format!("Unknown action: {other}")),
        }
    }

    /// Build an action from a POST body. Missing `action` means `list`;
    /// an action name outside the surface is `Unknown action: ...`; a known
    /// action whose fields don't validate is `Invalid request: ...`.
    pub fn from_json(body: &[u8]) -> Result<Self, String> {
        let mut value: serde_json::Value =
            serde_json::from_slice(body).map_err(|e| format!("Invalid request: {e}"))?;
        let Some(object) = value.as_object_mut() else {
            return Err("Invalid request: body must be a JSON object".to_string());
        };

        let action = object
            .get("action")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("list")
            .to_string();
        if !ACTION_NAMES.contains(&action.as_str()) {
            return Err(format!("Unknown action: {action}"));
        }
        object
            .entry("action")
            .or_insert_with(|| serde_json::Value::String("list".to_string()));

        serde_json::from_value(value).map_err(|e| format!("Invalid request: {e}"))
    }
}

/// Run one action against the supervisor, producing the response payload.
///
/// App-level failures come back as `{error}` with a 200, matching what the
/// agent-facing surface has always done; transport-level errors are the
/// router's business.
pub async fn dispatch(supervisor: &Supervisor, action: WebappAction) -> Value {
    debug!(?action, "webapp action");
    match action {
        WebappAction::List => match supervisor.registry().list() {
            Ok(apps) => json!({
                "apps": apps,
                "apps_dir": supervisor.registry().apps_dir(),
            }),
            Err(e) => json!({ "error": e.to_string() }),
        },

        WebappAction::AllocPort => match supervisor.next_available_port() {
            Ok(port) => json!({ "port": port }),
            Err(e) => json!({ "error": e.to_string() }),
        },

        WebappAction::Status { name } => match supervisor.registry().get(&name) {
            Ok(Some(app)) => json!({ "app": app }),
            Ok(None) => json!({ "error": format!("App '{name}' not registered") }),
            Err(e) => json!({ "error": e.to_string() }),
        },

        WebappAction::Register {
            name,
            port,
            cmd,
            cwd,
            description,
            env,
            autostart,
            core,
            ws_port,
        } => {
            let spec = RegisterApp {
                name: name.clone(),
                port,
                cmd,
                cwd,
                description,
                env,
                autostart,
                core,
                ws_port,
            };
            match supervisor.register_app(spec) {
                Ok(app) => json!({ "app": app, "url": format!("/{name}/") }),
                Err(e) => json!({ "error": e.to_string() }),
            }
        }

        WebappAction::Start { name } => match supervisor.start_app(&name).await {
            Ok(app) => json!({ "app": app, "url": format!("/{name}/") }),
            Err(e) => json!({ "error": e.to_string() }),
        },

        WebappAction::Stop { name } => match supervisor.stop_app(&name).await {
            Ok(app) => json!({ "app": app }),
            Err(e) => json!({ "error": e.to_string() }),
        },

        WebappAction::Restart { name } => match supervisor.restart_app(&name).await {
            Ok(app) => json!({ "app": app, "url": format!("/{name}/") }),
            Err(e) => json!({ "error": e.to_string() }),
        },

        WebappAction::Remove { name } => match supervisor.remove_app(&name).await {
            Ok(removed) => json!({ "removed": removed, "name": name }),
            // Core apps land here with "Cannot remove core app ..."
            Err(e) => json!({ "error": e.to_string() }),
        },

        WebappAction::Autostart { name, enabled } => {
            match supervisor.set_autostart(&name, enabled) {
                Ok(app) => json!({ "app": app }),
                Err(e) => json!({ "error": e.to_string() }),
            }
        }
    }
}

#[cfg(test)]
#[path = "webapp_tests.rs"]
mod tests;
