// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors from the terminal orchestrator and CLI wrappers.
#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("tmux {command} failed: {stderr} — Is shared-terminal running?")]
    Tmux { command: &'static str, stderr: String },

    #[error("Ready-state wait timed out after {seconds}s (Ctrl-C sent to the pane)")]
    ReadyTimeout { seconds: u64 },

    #[error("Command timed out after {seconds}s. Last terminal output:\n{screen}")]
    CommandTimeout { seconds: u64, screen: String },

    #[error("Invalid prompt pattern: {0}")]
    Pattern(String),

    #[error("{binary} binary not found in PATH")]
    CliNotFound { binary: String },

    #[error("{binary} timed out after {seconds}s")]
    CliTimeout { binary: String, seconds: u64 },

    #[error("{binary} exited {code}: {stderr}")]
    CliExit { binary: String, code: i32, stderr: String },

    #[error("{binary} API error: {message}")]
    CliApi { binary: String, message: String },

    #[error("Malformed JSON from {binary}: {source}")]
    CliJson {
        binary: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Session not started — call start() first")]
    NotStarted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TerminalError {
    /// The CLI's dead-session signature: exit 1 with `No conversation found`
    /// on stderr. `turn_with_recovery` retries these with a fresh session.
    pub fn is_dead_session(&self) -> bool {
        matches!(
            self,
            Self::CliExit { code: 1, stderr, .. } if stderr.contains("No conversation found")
        )
    }
}
