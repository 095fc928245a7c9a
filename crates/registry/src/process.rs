// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PID liveness probe.

use nix::sys::signal::kill;
use nix::unistd::Pid;

/// True when `pid` names a live process we may signal.
///
/// Signal 0 performs the permission and existence checks without delivering
/// anything. A PID recycled to a process owned by another user reports
/// EPERM, which still means "alive" for staleness purposes.
pub fn pid_alive(pid: i32) -> bool {
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(nix::errno::Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
