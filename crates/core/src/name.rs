// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! App-name rules: character set, reserved prefixes, built-in core set.

use thiserror::Error;

/// First path segments that belong to the host framework and must never be
/// intercepted, even if someone registers an app with the same name.
pub const RESERVED: &[&str] = &[
    "",
    "mcp",
    "a2a",
    "login",
    "logout",
    "health",
    "dev-ping",
    "socket.io",
    "static",
    // common api handlers (non-exhaustive; the registry check is the real guard)
    "message",
    "poll",
    "settings_get",
    "settings_set",
    "csrf_token",
    "chat_create",
    "chat_load",
    "upload",
    "webapp",
];

/// Apps seeded at boot that cannot be removed. Reads coerce `core = true`
/// for these names so registry files written before the flag existed behave
/// the same as freshly seeded ones.
pub const CORE_APPS: &[&str] = &["shared-browser", "shared-terminal"];

/// Errors from app-name validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NameError {
    #[error("App name cannot be empty")]
    Empty,

    #[error("App name '{0}' contains invalid characters (allowed: A-Z a-z 0-9 _ -)")]
    InvalidChars(String),

    #[error("App name '{0}' is reserved")]
    Reserved(String),
}

/// True when `segment` belongs to the host framework.
pub fn is_reserved(segment: &str) -> bool {
    RESERVED.contains(&segment)
}

/// True when `name` is in the built-in core set.
pub fn is_core_app(name: &str) -> bool {
    CORE_APPS.contains(&name)
}

/// Validate a candidate app name: `[A-Za-z0-9_-]+`, not reserved.
pub fn validate_name(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-') {
        return Err(NameError::InvalidChars(name.to_string()));
    }
    if is_reserved(name) {
        return Err(NameError::Reserved(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
#[path = "name_tests.rs"]
mod tests;
