// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Volatile drawer state for the right-side app tab strip.
//!
//! Never persisted; reset at supervisor boot. Concurrent writers (the agent
//! and the UI) are last-writer-wins — no fairness is attempted.

use serde::{Deserialize, Serialize};

/// Tab strip state: which apps are open as tabs and which is focused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawerState {
    /// Whether the drawer is visible
    pub open: bool,
    /// Tab order, oldest first
    pub apps: Vec<String>,
    /// The focused tab, if any
    pub active: Option<String>,
}

impl DrawerState {
    /// Add `name` as a tab (if absent), focus it and show the drawer.
    pub fn open_tab(&mut self, name: &str) {
        if !self.apps.iter().any(|a| a == name) {
            self.apps.push(name.to_string());
        }
        self.active = Some(name.to_string());
        self.open = true;
    }

    /// Hide the drawer. Tabs remain; re-opening shows them again.
    pub fn close(&mut self) {
        self.open = false;
    }

    /// Remove a tab. Focus falls back to the most recently opened remaining
    /// tab; the drawer closes when the last tab goes.
    pub fn close_tab(&mut self, name: &str) {
        self.apps.retain(|a| a != name);
        if self.active.as_deref() == Some(name) {
            self.active = self.apps.last().cloned();
        }
        self.open = !self.apps.is_empty();
    }
}

#[cfg(test)]
#[path = "drawer_tests.rs"]
mod tests;
