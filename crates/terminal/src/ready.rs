// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ready-state detection strategies.
//!
//! "Is the shell/TUI ready?" is a strategy object: prompt-pattern match,
//! pane stability, sentinel marker, or any composite of them. The polling
//! loop itself lives in `TmuxSession::wait_ready`.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::error::TerminalError;
use crate::tmux::TmuxSession;

/// Default wait budget when the caller has no better number.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Delay before the first capture, so a stale prompt from before the
/// triggering keystroke can't be mistaken for completion.
const SETTLE_DELAY: Duration = Duration::from_millis(300);
/// Interval between captures.
const POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Lines captured per poll.
const POLL_LINES: u32 = 50;

/// A readiness signal fed with successive ANSI-clean captures.
pub trait ReadyStrategy: Send {
    /// Observe one capture; true when the pane is ready.
    fn observe(&mut self, clean: &str) -> bool;
}

/// Ready when the last non-blank line matches a pattern.
///
/// Patterns may use look-around (the TUI busy-state check needs a negative
/// lookahead), hence `fancy_regex`.
pub struct PromptPattern {
    regex: fancy_regex::Regex,
}

impl PromptPattern {
    pub fn new(pattern: &str) -> Result<Self, TerminalError> {
        let regex =
            fancy_regex::Regex::new(pattern).map_err(|e| TerminalError::Pattern(e.to_string()))?;
        Ok(Self { regex })
    }
}

impl ReadyStrategy for PromptPattern {
    fn observe(&mut self, clean: &str) -> bool {
        let Some(last) = clean.lines().rev().find(|line| !line.trim().is_empty()) else {
            return false;
        };
        self.regex.is_match(last).unwrap_or(false)
    }
}

/// Ready when two consecutive captures are byte-identical — the pane has
/// stopped changing.
#[derive(Default)]
pub struct Stability {
    prev: Option<String>,
}

impl ReadyStrategy for Stability {
    fn observe(&mut self, clean: &str) -> bool {
        let stable = self.prev.as_deref() == Some(clean);
        if !stable {
            self.prev = Some(clean.to_string());
        }
        stable
    }
}

/// Ready when a sentinel marker shows up anywhere in the capture.
pub struct SentinelMarker {
    marker: String,
}

impl SentinelMarker {
    pub fn new(marker: impl Into<String>) -> Self {
        Self { marker: marker.into() }
    }
}

impl ReadyStrategy for SentinelMarker {
    fn observe(&mut self, clean: &str) -> bool {
        clean.contains(&self.marker)
    }
}

/// Ready when any inner strategy is.
pub struct FirstOf {
    inner: Vec<Box<dyn ReadyStrategy>>,
}

impl FirstOf {
    pub fn new(inner: Vec<Box<dyn ReadyStrategy>>) -> Self {
        Self { inner }
    }
}

impl ReadyStrategy for FirstOf {
    fn observe(&mut self, clean: &str) -> bool {
        // Every strategy observes every capture; Stability needs the feed
        // even while a sibling hasn't matched yet
        let mut ready = false;
        for strategy in &mut self.inner {
            if strategy.observe(clean) {
                ready = true;
            }
        }
        ready
    }
}

/// The default composite: prompt pattern as the primary signal, pane
/// stability as the secondary.
pub fn shell_ready(pattern: &str) -> Result<FirstOf, TerminalError> {
    Ok(FirstOf::new(vec![
        Box::new(PromptPattern::new(pattern)?),
        Box::new(Stability::default()),
    ]))
}

impl TmuxSession {
    /// Poll the pane until `strategy` reports ready or `budget` elapses.
    ///
    /// Returns the final ANSI-clean capture. On timeout, Ctrl-C is sent to
    /// the pane to interrupt whatever is running, then the error surfaces.
    pub async fn wait_ready(
        &self,
        pane: Option<&str>,
        strategy: &mut dyn ReadyStrategy,
        budget: Duration,
    ) -> Result<String, TerminalError> {
        let deadline = Instant::now() + budget;
        tokio::time::sleep(SETTLE_DELAY).await;

        while Instant::now() < deadline {
            let clean = self.read(pane, POLL_LINES).await?;
            if strategy.observe(&clean) {
                debug!(pane = ?pane, "pane ready");
                return Ok(clean);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        self.interrupt(pane).await?;
        Err(TerminalError::ReadyTimeout { seconds: budget.as_secs() })
    }
}

#[cfg(test)]
#[path = "ready_tests.rs"]
mod tests;
