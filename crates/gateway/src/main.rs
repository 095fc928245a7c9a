// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! dhd — the dockhand gateway daemon.

use tracing::error;
use tracing_subscriber::EnvFilter;

use dh_gateway::{run, Config};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match dh_gateway::env::log_dir() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "dhd.log");
            tracing_subscriber::fmt().with_env_filter(filter).with_writer(appender).init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    init_tracing();
    let config = Config::from_env();
    match run(config).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "gateway failed");
            std::process::ExitCode::FAILURE
        }
    }
}
