// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! First-segment extraction and prefix stripping.

use dh_core::is_reserved;

/// Extract the first path segment; `None` for reserved segments.
///
/// Reserved prefixes win even against a registered app with the same name,
/// so the host framework's own routes can never be shadowed.
pub fn app_name_from_path(path: &str) -> Option<&str> {
    let seg = path.trim_matches('/').split('/').next().unwrap_or("");
    if is_reserved(seg) {
        None
    } else {
        Some(seg)
    }
}

/// Drop the leading `/{name}` from `path`, keeping the rest.
/// An empty remainder becomes `/`.
pub fn strip_app_prefix(path: &str, name: &str) -> String {
    let prefix_len = 1 + name.len();
    let stripped = path.get(prefix_len..).unwrap_or("");
    if stripped.is_empty() {
        "/".to_string()
    } else if stripped.starts_with('/') {
        stripped.to_string()
    } else {
        format!("/{stripped}")
    }
}

#[cfg(test)]
#[path = "path_tests.rs"]
mod tests;
