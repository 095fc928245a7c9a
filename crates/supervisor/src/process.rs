// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process spawn and teardown helpers.
//!
//! Spawned commands are shell-interpreted and made process-group leaders so
//! a later signal to the recorded PID reaches the whole tree. Wrapper
//! scripts that want the tracked PID to be the leaf process should `exec`
//! their launcher; core app seeds do.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tracing::debug;

use dh_registry::pid_alive;

/// Spawn `cmd` via `sh -c` in `cwd` with `env` layered over the parent
/// environment, stdout/stderr discarded. Returns the PID, which is also the
/// process group id.
pub(crate) fn spawn_shell(
    cmd: &str,
    cwd: &Path,
    env: &HashMap<String, String>,
) -> std::io::Result<i32> {
    let mut command = tokio::process::Command::new("sh");
    command
        .arg("-c")
        .arg(cmd)
        .current_dir(cwd)
        .envs(env)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .process_group(0);

    let child = command.spawn()?;
    let pid = child
        .id()
        .map(|id| id as i32)
        .ok_or_else(|| std::io::Error::other("spawned process has no pid"))?;
    // The Child handle is dropped here; the runtime reaps the process when
    // it exits. Lifecycle tracking goes through the registry PID instead.
    debug!(pid, cmd, "spawned app process");
    Ok(pid)
}

/// Signal the process group of `pid`.
fn signal_group(pid: i32, signal: Signal) {
    if let Err(e) = killpg(Pid::from_raw(pid), signal) {
        debug!(pid, %signal, error = %e, "group signal failed");
    }
}

/// SIGTERM the group, wait `grace`, SIGKILL if the leader is still alive.
/// No-op when the process is already gone.
pub(crate) async fn terminate_group(pid: i32, grace: Duration) {
    // A non-positive pid would address every process on the host
    if pid <= 0 || !pid_alive(pid) {
        return;
    }
    signal_group(pid, Signal::SIGTERM);
    tokio::time::sleep(grace).await;
    if pid_alive(pid) {
        signal_group(pid, Signal::SIGKILL);
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
