// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sentinel-based command execution in the shared pane.
//!
//! A unique marker is echoed after the command so the poller knows exactly
//! when it finished and with which exit code, without parsing prompts.

use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use crate::error::TerminalError;
use crate::tmux::TmuxSession;

const POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Scrollback captured while polling for the marker.
const CAPTURE_LINES: u32 = 500;

/// Output of a sentinel-run command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Pane content up to (not including) the marker line
    pub output: String,
    /// Exit code parsed from the marker, if the shell reported one
    pub exit_code: Option<i32>,
}

/// Run `command` in the pane and wait for its sentinel.
///
/// On timeout the current screen contents travel with the error so the
/// caller can see what the command was doing.
pub async fn run_command(
    tmux: &TmuxSession,
    pane: Option<&str>,
    command: &str,
    budget: Duration,
) -> Result<CommandOutput, TerminalError> {
    let marker = format!("__A0_{}", &Uuid::new_v4().simple().to_string()[..12]);
    let full = format!("{command} ; echo \"{marker}:$?\"");
    tmux.send(&full, pane).await?;

    let deadline = Instant::now() + budget;
    loop {
        tokio::time::sleep(POLL_INTERVAL).await;
        if Instant::now() >= deadline {
            break;
        }

        let pane_text = tmux.capture_raw(pane, CAPTURE_LINES).await?;
        if let Some(result) = extract_output(&pane_text, &marker) {
            return Ok(result);
        }
    }

    // Timed out — surface whatever is on screen
    let screen = tmux.capture_raw(pane, CAPTURE_LINES).await?.trim_end().to_string();
    Err(TerminalError::CommandTimeout { seconds: budget.as_secs(), screen })
}

/// Find the sentinel line in a capture; split off the output before it and
/// the exit code.
///
/// The echoed command line also contains the marker text (as
/// `{marker}:$?`), so only a line *starting* with `marker:` whose remainder
/// is not the unexpanded `$?` counts as the completion signal.
fn extract_output(pane: &str, marker: &str) -> Option<CommandOutput> {
    let prefix = format!("{marker}:");
    let mut offset = 0;
    for line in pane.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if let Some(rest) = trimmed.strip_prefix(&prefix) {
            let rest = rest.trim();
            if !rest.starts_with("$?") {
                return Some(CommandOutput {
                    output: pane[..offset].trim_end().to_string(),
                    exit_code: rest.parse().ok(),
                });
            }
        }
        offset += line.len();
    }
    None
}

#[cfg(test)]
#[path = "sentinel_tests.rs"]
mod tests;
