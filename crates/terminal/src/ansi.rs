// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ANSI escape sequence stripping.
//!
//! Captures are taken without asking tmux for escape codes, so this regex
//! is a safety net. Three alternatives, in this exact order:
//!
//! 1. OSC title sequences: `ESC ] … BEL`
//! 2. Two-character sequences: `ESC [@-Z\-_]`
//! 3. CSI sequences: `ESC [ params intermediates final`
//!
//! The order matters: `]` (0x5D) falls inside the `\-_` range of the
//! two-character branch, so OSC must match first or its payload would leak
//! through as text.

use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::unwrap_used)] // pattern is a compile-time constant
static ANSI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b(?:\][^\x07]*\x07|[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])").unwrap()
});

/// Remove ANSI escape sequences, leaving plain text.
pub fn strip_ansi(input: &str) -> String {
    ANSI_RE.replace_all(input, "").into_owned()
}

#[cfg(test)]
#[path = "ansi_tests.rs"]
mod tests;
