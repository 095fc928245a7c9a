// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dh-supervisor: app lifecycle on top of the registry.
//!
//! Spawns registered apps as process-group leaders through the shell,
//! stops them with SIGTERM-then-SIGKILL escalation, seeds the core apps at
//! boot and recovers from stale PIDs left by a previous container lifetime.

mod error;
mod probe;
mod process;
mod seed;
mod supervisor;

pub use error::SupervisorError;
pub use probe::{wait_for_port, SHARED_BROWSER_CDP_PORT};
pub use seed::seed_core_apps;
pub use supervisor::{AppReadiness, OpenedApp, RegisterApp, Supervisor};
