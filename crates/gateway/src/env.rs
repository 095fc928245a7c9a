// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the gateway.

use std::path::PathBuf;

/// Apps directory: `DH_APPS_DIR` > `./apps`.
pub fn apps_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("DH_APPS_DIR") {
        return PathBuf::from(dir);
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join("apps")
}

/// Outer port the whole system is exposed on (default 50000).
pub fn outer_port() -> u16 {
    std::env::var("DH_PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(50_000)
}

/// Bind address for the outer listener (default loopback).
pub fn bind_host() -> String {
    std::env::var("DH_BIND").unwrap_or_else(|_| "127.0.0.1".to_string())
}

/// Optional log directory; when set, logs go to a daily-rotated file there
/// instead of stderr.
pub fn log_dir() -> Option<PathBuf> {
    std::env::var("DH_LOG_DIR").ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
