// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Self-describing error pages for apps that are registered but not
//! reachable.

use dh_core::AppRecord;

/// HTML page shown when `/{name}/` is hit while the app is not running
/// (503) or its port is not answering (502). Names the app, its status and
/// port, and tells the operator how to start it.
pub fn not_running_html(app_name: &str, record: Option<&AppRecord>) -> String {
    let status = record.map_or_else(|| "not registered".to_string(), |r| r.status.to_string());
    let port = record.map_or_else(|| "?".to_string(), |r| r.port.to_string());
    let desc = record.map(|r| r.description.as_str()).unwrap_or("");
    let desc_block = if desc.is_empty() {
        String::new()
    } else {
        format!("<p>{desc}</p>\n    ")
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <title>App not running — {app_name}</title>
  <style>
    body {{ font-family: system-ui, sans-serif; background:#111; color:#eee;
            display:flex; align-items:center; justify-content:center; height:100vh; margin:0; }}
    .box {{ background:#1e1e1e; border:1px solid #333; border-radius:12px;
             padding:2rem 3rem; max-width:480px; text-align:center; }}
    h1 {{ font-size:1.4rem; margin-bottom:.5rem; color:#f90; }}
    p {{ color:#aaa; font-size:.95rem; line-height:1.5; }}
    code {{ background:#2a2a2a; padding:.2em .5em; border-radius:4px; font-size:.9em; }}
  </style>
</head>
<body>
  <div class="box">
    <h1>/{app_name}/ is not running</h1>
    <p>Status: <code>{status}</code> &nbsp;|&nbsp; Port: <code>{port}</code></p>
    {desc_block}<p>Ask the agent to start it:<br>
       <code>"start the {app_name} app"</code></p>
  </div>
</body>
</html>"#
    )
}

#[cfg(test)]
#[path = "pages_tests.rs"]
mod tests;
