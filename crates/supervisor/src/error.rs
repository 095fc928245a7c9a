// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use dh_core::NameError;
use dh_registry::RegistryError;
use thiserror::Error;

/// Errors from app lifecycle operations.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("App '{0}' not registered")]
    UnknownApp(String),

    #[error("Cannot remove core app '{0}'")]
    CoreApp(String),

    #[error(transparent)]
    Name(#[from] NameError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Failed to spawn '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
