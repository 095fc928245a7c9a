// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP readiness probes for freshly started apps.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};

/// CDP port of the shared browser (a process-wide singleton owned by
/// whichever supervisor last started the `shared-browser` app).
pub const SHARED_BROWSER_CDP_PORT: u16 = 9222;

/// How long to wait for Chromium's CDP port after opening the shared browser.
pub(crate) const SHARED_BROWSER_CDP_WAIT: Duration = Duration::from_secs(20);

/// How long to wait for ttyd's HTTP port after opening the shared terminal.
pub(crate) const SHARED_TERMINAL_HTTP_WAIT: Duration = Duration::from_secs(15);

/// Poll until `host:port` accepts a TCP connection or `budget` elapses.
/// Each attempt gets 2 s; attempts are 1 s apart.
pub async fn wait_for_port(host: &str, port: u16, budget: Duration) -> bool {
    let deadline = Instant::now() + budget;
    while Instant::now() < deadline {
        match timeout(Duration::from_secs(2), TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => {
                drop(stream);
                return true;
            }
            _ => tokio::time::sleep(Duration::from_secs(1)).await,
        }
    }
    false
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
