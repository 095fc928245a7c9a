// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Claude CLI invocation helpers.
//!
//! Single-turn `--print` calls plus a stateful multi-turn session built on
//! `--resume <uuid>`. The CLI misbehaves when it detects its own launcher
//! through the `CLAUDECODE` environment variable, so the child environment
//! is built as a filtered copy — the parent environment is never mutated.

use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::ansi::strip_ansi;
use crate::error::TerminalError;

/// Default per-turn budget; the API typically answers well inside it.
pub const CLAUDE_DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Environment variable stripped from the child (by copy only).
const LAUNCHER_VAR: &str = "CLAUDECODE";

/// JSON payload of `--output-format json`.
#[derive(Debug, Deserialize)]
struct TurnPayload {
    result: String,
    session_id: String,
    #[serde(default)]
    is_error: bool,
}

/// One turn's result after dead-session recovery.
#[derive(Debug, Clone)]
pub struct RecoveredTurn {
    pub text: String,
    pub session_id: String,
    /// True when the stored session was dead and a fresh one was started;
    /// prior conversation context is lost.
    pub was_recovered: bool,
}

/// Configured invoker for the `claude` binary.
#[derive(Debug, Clone)]
pub struct ClaudeCli {
    binary: String,
    model: Option<String>,
    budget: Duration,
}

impl Default for ClaudeCli {
    fn default() -> Self {
        Self { binary: "claude".to_string(), model: None, budget: CLAUDE_DEFAULT_TIMEOUT }
    }
}

impl ClaudeCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the model (e.g. "haiku", "sonnet", "opus").
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_timeout(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Single-turn call, JSON output. Returns the clean response text.
    pub async fn single_turn(&self, prompt: &str) -> Result<String, TerminalError> {
        let stdout = self.run(&["--print", "--output-format", "json"], None, prompt).await?;
        let payload = self.parse_payload(&stdout)?;
        Ok(payload.result)
    }

    /// Single-turn call, plain text output. No metadata, no JSON wrapper.
    pub async fn single_turn_text(&self, prompt: &str) -> Result<String, TerminalError> {
        let stdout = self.run(&["--print", "--output-format", "text"], None, prompt).await?;
        Ok(strip_ansi(&stdout).trim().to_string())
    }

    /// One turn of a multi-turn conversation. Pass the returned session id
    /// to the next call to continue it.
    pub async fn turn(
        &self,
        prompt: &str,
        session_id: Option<&str>,
    ) -> Result<(String, String), TerminalError> {
        let stdout =
            self.run(&["--print", "--output-format", "json"], session_id, prompt).await?;
        let payload = self.parse_payload(&stdout)?;
        Ok((payload.result, payload.session_id))
    }

    /// `turn`, but when the CLI reports the stored session is dead (exit 1,
    /// `No conversation found` on stderr) retry once with a fresh session.
    ///
    /// Always resumes by UUID rather than `--continue`: cwd-based resolution
    /// races when several sessions share a working directory.
    pub async fn turn_with_recovery(
        &self,
        prompt: &str,
        session_id: Option<&str>,
    ) -> Result<RecoveredTurn, TerminalError> {
        match self.turn(prompt, session_id).await {
            Ok((text, sid)) => {
                Ok(RecoveredTurn { text, session_id: sid, was_recovered: false })
            }
            Err(e) if session_id.is_some() && e.is_dead_session() => {
                info!(error = %e, "dead session, starting fresh");
                let (text, sid) = self.turn(prompt, None).await?;
                Ok(RecoveredTurn { text, session_id: sid, was_recovered: true })
            }
            Err(e) => Err(e),
        }
    }

    async fn run(
        &self,
        base_args: &[&str],
        session_id: Option<&str>,
        prompt: &str,
    ) -> Result<String, TerminalError> {
        let mut command = Command::new(&self.binary);
        command.args(base_args);
        if let Some(model) = &self.model {
            command.args(["--model", model]);
        }
        if let Some(session) = session_id {
            command.args(["--resume", session]);
        }
        command.arg(prompt);

        // Filtered copy of the parent environment; never unset globally
        command.env_clear().envs(std::env::vars().filter(|(key, _)| key != LAUNCHER_VAR));
        command.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
        command.kill_on_drop(true);

        debug!(binary = %self.binary, session = ?session_id, "invoking CLI");
        let output = match timeout(self.budget, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TerminalError::CliNotFound { binary: self.binary.clone() })
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                return Err(TerminalError::CliTimeout {
                    binary: self.binary.clone(),
                    seconds: self.budget.as_secs(),
                })
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let detail = if stderr.is_empty() { stdout.trim().to_string() } else { stderr };
            return Err(TerminalError::CliExit {
                binary: self.binary.clone(),
                code: output.status.code().unwrap_or(-1),
                stderr: truncate(&detail, 400),
            });
        }
        Ok(stdout)
    }

    fn parse_payload(&self, stdout: &str) -> Result<TurnPayload, TerminalError> {
        // Safety strip: a captured pipe gets no ANSI, but handle edge cases
        let clean = strip_ansi(stdout);
        let payload: TurnPayload =
            serde_json::from_str(clean.trim()).map_err(|source| TerminalError::CliJson {
                binary: self.binary.clone(),
                source,
            })?;
        if payload.is_error {
            return Err(TerminalError::CliApi {
                binary: self.binary.clone(),
                message: payload.result,
            });
        }
        Ok(payload)
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}

/// Stateful wrapper around `ClaudeCli::turn`: tracks the session UUID so
/// callers never manage it directly.
#[derive(Debug, Default)]
pub struct ClaudeSession {
    cli: ClaudeCli,
    session_id: Option<String>,
}

impl ClaudeSession {
    pub fn new(cli: ClaudeCli) -> Self {
        Self { cli, session_id: None }
    }

    /// Send one prompt; the session id is stored for the next turn.
    pub async fn turn(&mut self, prompt: &str) -> Result<String, TerminalError> {
        let (text, session_id) = self.cli.turn(prompt, self.session_id.as_deref()).await?;
        self.session_id = Some(session_id);
        Ok(text)
    }

    /// Like `turn`, with transparent dead-session recovery.
    pub async fn turn_with_recovery(&mut self, prompt: &str) -> Result<RecoveredTurn, TerminalError> {
        let recovered = self.cli.turn_with_recovery(prompt, self.session_id.as_deref()).await?;
        self.session_id = Some(recovered.session_id.clone());
        Ok(recovered)
    }

    /// Forget the session; the next turn starts a fresh conversation.
    pub fn reset(&mut self) {
        self.session_id = None;
    }

    /// The current session UUID (`None` before the first turn).
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }
}

#[cfg(test)]
#[path = "claude_tests.rs"]
mod tests;
