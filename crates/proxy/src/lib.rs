// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! dh-proxy: path-prefix reverse proxy for registered apps.
//!
//! Middleware in front of the host framework. The first path segment of an
//! outer request selects a registered app; matching requests are forwarded
//! to the app's inner port (HTTP) or tunnelled over raw TCP (WebSocket).
//! Everything else — reserved prefixes, unknown segments — passes through
//! to the wrapped router.

mod http;
mod layer;
mod pages;
mod path;
mod ws;

pub use layer::{proxy_middleware, ProxyState};
pub use pages::not_running_html;
pub use path::{app_name_from_path, strip_app_prefix};
