// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OpenCode TUI session over the shared tmux pane.
//!
//! OpenCode never returns to a shell prompt, so completion detection runs
//! on its status chrome instead. Two ready states:
//!
//! 1. Initial startup — the status bar shows `{workdir}  major.minor.patch`
//!    at the bottom right.
//! 2. Post-response — the hints bar shows `ctrl+t variants  tab agents`
//!    *without* the `esc interrupt` hint that marks the busy state.

use std::time::Duration;

use tracing::info;

use crate::error::TerminalError;
use crate::ready::shell_ready;
use crate::tmux::TmuxSession;

/// Budget for the TUI to reach its initial ready state (observed startup is
/// around 1.5 s).
pub const OPENCODE_START_TIMEOUT: Duration = Duration::from_secs(15);

/// Default budget for one AI response.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(120);

/// Lines captured after a response; enough for the full response history.
const RESPONSE_CAPTURE_LINES: u32 = 300;

/// The TUI input widget needs a moment after process start before it
/// accepts the first prompt.
const INPUT_SETTLE: Duration = Duration::from_millis(500);

/// Pause for the command palette to open before typing into it.
const PALETTE_SETTLE: Duration = Duration::from_millis(200);

/// Shell prompt pattern used to confirm the TUI handed the pane back.
const SHELL_PROMPT: &str = r"[$#>%]\s*$";

/// Stateful OpenCode TUI lifecycle: `start()` / `send()` / `exit()`.
///
/// Multi-turn context lives in the TUI process itself, which stays running
/// between `send` calls.
pub struct OpenCodeSession {
    tmux: TmuxSession,
    workdir: String,
    response_budget: Duration,
    running: bool,
}

impl OpenCodeSession {
    /// Session against the default shared pane, working on `workdir`.
    pub fn new(workdir: impl Into<String>) -> Self {
        Self::with_tmux(TmuxSession::default(), workdir)
    }

    pub fn with_tmux(tmux: TmuxSession, workdir: impl Into<String>) -> Self {
        Self {
            tmux,
            workdir: workdir.into(),
            response_budget: RESPONSE_TIMEOUT,
            running: false,
        }
    }

    /// Adjust the per-response budget (slow models, large file analysis).
    pub fn with_response_timeout(mut self, budget: Duration) -> Self {
        self.response_budget = budget;
        self
    }

    pub fn running(&self) -> bool {
        self.running
    }

    /// The two-state ready pattern for this session's working directory.
    fn ready_pattern(&self) -> String {
        let workdir = regex::escape(&self.workdir);
        format!(
            r"^(?:\s*{workdir}\s+\d+\.\d+\.\d+\s*$|(?!.*esc interrupt).*ctrl\+t variants\s+tab agents)"
        )
    }

    /// Launch the TUI in the shared pane and wait for the ready state.
    ///
    /// The PATH export is a no-op when already present in the shell.
    pub async fn start(&mut self) -> Result<(), TerminalError> {
        let launch =
            format!("export PATH=$HOME/.opencode/bin:$PATH && opencode {}", self.workdir);
        self.tmux.send(&launch, None).await?;
        // Let the input widget activate before polling for readiness
        tokio::time::sleep(INPUT_SETTLE).await;

        let mut ready = shell_ready(&self.ready_pattern())?;
        self.tmux.wait_ready(None, &mut ready, OPENCODE_START_TIMEOUT).await?;
        self.running = true;
        info!(workdir = %self.workdir, "opencode ready");
        Ok(())
    }

    /// Send one prompt; wait for the response; return the ANSI-clean pane.
    ///
    /// The capture includes TUI chrome alongside the response text.
    pub async fn send(&mut self, prompt: &str) -> Result<String, TerminalError> {
        if !self.running {
            return Err(TerminalError::NotStarted);
        }
        self.tmux.send(prompt, None).await?;

        let mut ready = shell_ready(&self.ready_pattern())?;
        self.tmux.wait_ready(None, &mut ready, self.response_budget).await?;
        self.tmux.read(None, RESPONSE_CAPTURE_LINES).await
    }

    /// Exit cleanly via the Ctrl-P command palette. Idempotent.
    ///
    /// Typing `/exit` would not work: `/` opens the agent picker, and the
    /// rest of the text lands in its search box while the TUI stays open.
    pub async fn exit(&mut self) -> Result<(), TerminalError> {
        if !self.running {
            return Ok(());
        }

        self.tmux.keys(&["C-p"], None).await?;
        tokio::time::sleep(PALETTE_SETTLE).await;
        self.tmux.send("exit", None).await?;

        let mut ready = shell_ready(SHELL_PROMPT)?;
        self.tmux.wait_ready(None, &mut ready, OPENCODE_START_TIMEOUT).await?;
        self.running = false;
        Ok(())
    }
}

#[cfg(test)]
#[path = "opencode_tests.rs"]
mod tests;
