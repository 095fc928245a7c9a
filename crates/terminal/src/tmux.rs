// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tmux primitives against the shared session.
//!
//! Both the human (via the shared-terminal app) and the agent write to the
//! same panes; races resolve last-writer-wins at the keystroke level.

use tokio::process::Command;
use tracing::debug;

use crate::ansi::strip_ansi;
use crate::error::TerminalError;

/// Name of the shared session, as created by the shared-terminal app.
pub const DEFAULT_SESSION: &str = "shared";

/// Handle to one tmux session.
#[derive(Debug, Clone)]
pub struct TmuxSession {
    session: String,
}

impl Default for TmuxSession {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION)
    }
}

impl TmuxSession {
    pub fn new(session: impl Into<String>) -> Self {
        Self { session: session.into() }
    }

    /// The send/capture target: an explicit pane, or the whole session.
    fn target<'a>(&'a self, pane: Option<&'a str>) -> &'a str {
        pane.unwrap_or(&self.session)
    }

    /// Inject literal `text` followed by Enter.
    ///
    /// `text` stays one argument so tmux never interprets words like "Tab"
    /// as key names; "Enter" is the separate final argument — that one *is*
    /// the key press.
    pub async fn send(&self, text: &str, pane: Option<&str>) -> Result<(), TerminalError> {
        let target = self.target(pane);
        debug!(pane = target, text, "tmux send");
        run_tmux("send-keys", &["send-keys", "-t", target, text, "Enter"]).await?;
        Ok(())
    }

    /// Inject key names without appending Enter (Ctrl-C, Ctrl-P, arrows...).
    /// Each element *is* a tmux key name — unlike `send`.
    pub async fn keys(&self, keys: &[&str], pane: Option<&str>) -> Result<(), TerminalError> {
        let target = self.target(pane);
        debug!(pane = target, ?keys, "tmux keys");
        let mut args = vec!["send-keys", "-t", target];
        args.extend_from_slice(keys);
        run_tmux("send-keys", &args).await?;
        Ok(())
    }

    /// Capture the last `lines` of the pane as plain text.
    ///
    /// No `-e` flag: tmux then renders without escape sequences, and the
    /// ANSI regex runs over the result as a safety net.
    pub async fn read(&self, pane: Option<&str>, lines: u32) -> Result<String, TerminalError> {
        let raw = self.capture_raw(pane, lines).await?;
        Ok(strip_ansi(&raw).trim_end().to_string())
    }

    /// Raw capture-pane output (still without requesting escape codes).
    pub(crate) async fn capture_raw(
        &self,
        pane: Option<&str>,
        lines: u32,
    ) -> Result<String, TerminalError> {
        let target = self.target(pane);
        let from = format!("-{lines}");
        run_tmux("capture-pane", &["capture-pane", "-t", target, "-p", "-S", &from]).await
    }

    /// Interrupt whatever is running in the pane.
    pub async fn interrupt(&self, pane: Option<&str>) -> Result<(), TerminalError> {
        self.keys(&["C-c"], pane).await
    }
}

async fn run_tmux(command: &'static str, args: &[&str]) -> Result<String, TerminalError> {
    let output = Command::new("tmux").args(args).output().await?;
    if !output.status.success() {
        return Err(TerminalError::Tmux {
            command,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

#[cfg(test)]
#[path = "tmux_tests.rs"]
mod tests;
