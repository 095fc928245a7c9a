// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed registry store.
//!
//! All reads scrub stale PIDs first (signal 0), so staleness is bounded by
//! one read. Parse failure of the registry file is not fatal: the store
//! starts empty and the next mutation rewrites the file. Any other I/O
//! error is.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use dh_core::{is_core_app, AppRecord, AppStatus};

use crate::process::pid_alive;

/// Registry file name, inside the apps directory.
pub const REGISTRY_FILE: &str = ".app_registry.json";

/// Errors from registry persistence and lookups.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("App '{0}' not registered")]
    UnknownApp(String),

    #[error("No available ports in range {start}-{end}")]
    PortExhausted { start: u16, end: u16 },
}

/// Persistent app-name → record map.
///
/// The map mutex serialises every read and mutation; critical sections are
/// short (no I/O waits beyond the registry file itself). Callers that need
/// cross-operation atomicity (the supervisor's lifecycle operations) hold
/// their own lock around calls into here.
pub struct Registry {
    apps_dir: PathBuf,
    path: PathBuf,
    inner: Mutex<IndexMap<String, AppRecord>>,
}

impl Registry {
    /// Open (or initialise) the registry backing file under `apps_dir`.
    ///
    /// Creates the apps directory if missing, loads the file, then scrubs
    /// records whose PID is gone.
    pub fn open(apps_dir: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let apps_dir = apps_dir.into();
        fs::create_dir_all(&apps_dir)?;
        let path = apps_dir.join(REGISTRY_FILE);

        let map = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<IndexMap<String, AppRecord>>(&bytes) {
                Ok(map) => map,
                Err(e) => {
                    // Not fatal: start empty, the next mutation rewrites the file
                    warn!(path = %path.display(), error = %e, "registry parse failed, starting empty");
                    IndexMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => IndexMap::new(),
            Err(e) => return Err(e.into()),
        };

        let registry = Self { apps_dir, path, inner: Mutex::new(map) };
        registry.cleanup_dead()?;
        Ok(registry)
    }

    /// The directory apps live under.
    pub fn apps_dir(&self) -> &Path {
        &self.apps_dir
    }

    /// Downgrade records whose PID no longer corresponds to a live process.
    /// Persists iff anything changed.
    pub fn cleanup_dead(&self) -> Result<(), RegistryError> {
        let mut map = self.inner.lock();
        if scrub_dead(&mut map) {
            self.save_locked(&map)?;
        }
        Ok(())
    }

    /// Look up one record. Scrubs first; coerces `core` for built-in names.
    pub fn get(&self, name: &str) -> Result<Option<AppRecord>, RegistryError> {
        let mut map = self.inner.lock();
        if scrub_dead(&mut map) {
            self.save_locked(&map)?;
        }
        Ok(map.get(name).cloned().map(coerce_core))
    }

    /// All records in file order. Scrubs first; coerces `core`.
    pub fn list(&self) -> Result<Vec<AppRecord>, RegistryError> {
        let mut map = self.inner.lock();
        if scrub_dead(&mut map) {
            self.save_locked(&map)?;
        }
        Ok(map.values().cloned().map(coerce_core).collect())
    }

    /// Whether a record exists for `name`. Scrubs first, like every read.
    pub fn is_registered(&self, name: &str) -> Result<bool, RegistryError> {
        let mut map = self.inner.lock();
        if scrub_dead(&mut map) {
            self.save_locked(&map)?;
        }
        Ok(map.contains_key(name))
    }

    /// The inner HTTP port for `name`, if registered. Scrubs first.
    pub fn get_port(&self, name: &str) -> Result<Option<u16>, RegistryError> {
        let mut map = self.inner.lock();
        if scrub_dead(&mut map) {
            self.save_locked(&map)?;
        }
        Ok(map.get(name).map(|app| app.port))
    }

    /// Insert or overwrite a record and persist.
    pub fn insert(&self, record: AppRecord) -> Result<AppRecord, RegistryError> {
        let mut map = self.inner.lock();
        map.insert(record.name.clone(), record.clone());
        self.save_locked(&map)?;
        Ok(record)
    }

    /// Apply `mutate` to an existing record and persist. Returns the updated
    /// record, core-coerced like a read.
    pub fn update<F>(&self, name: &str, mutate: F) -> Result<AppRecord, RegistryError>
    where
        F: FnOnce(&mut AppRecord),
    {
        let mut map = self.inner.lock();
        let record = map
            .get_mut(name)
            .ok_or_else(|| RegistryError::UnknownApp(name.to_string()))?;
        mutate(record);
        let updated = record.clone();
        self.save_locked(&map)?;
        Ok(coerce_core(updated))
    }

    /// Delete a record and persist. Returns true iff a record was deleted.
    pub fn remove(&self, name: &str) -> Result<bool, RegistryError> {
        let mut map = self.inner.lock();
        let removed = map.shift_remove(name).is_some();
        if removed {
            self.save_locked(&map)?;
        }
        Ok(removed)
    }

    /// Walk `allocator`'s range and return the first port no record holds.
    ///
    /// Runs under the map lock so concurrent allocations cannot hand out the
    /// same port. Dead records still hold their port (their registration is
    /// intact), so the scan counts every record, alive or not.
    pub fn allocate_port(&self, allocator: &crate::PortAllocator) -> Result<u16, RegistryError> {
        let mut map = self.inner.lock();
        if scrub_dead(&mut map) {
            self.save_locked(&map)?;
        }
        allocator
            .first_free(map.values().map(|app| app.port))
            .ok_or(RegistryError::PortExhausted {
                start: allocator.start(),
                end: allocator.end(),
            })
    }

    /// Atomic write-then-rename of the whole map as indented JSON.
    fn save_locked(&self, map: &IndexMap<String, AppRecord>) -> Result<(), RegistryError> {
        fs::create_dir_all(&self.apps_dir)?;
        let bytes = serde_json::to_vec_pretty(map)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), apps = map.len(), "registry saved");
        Ok(())
    }
}

/// Set `status = stopped`, `pid = None` for records claiming a dead PID.
/// Returns true when anything changed.
fn scrub_dead(map: &mut IndexMap<String, AppRecord>) -> bool {
    let mut changed = false;
    for record in map.values_mut() {
        if record.status == AppStatus::Running {
            let alive = record.pid.is_some_and(pid_alive);
            if !alive {
                debug!(app = %record.name, pid = ?record.pid, "scrubbing dead process");
                record.mark_stopped();
                changed = true;
            }
        }
    }
    changed
}

/// Backwards-compat normaliser: registry files written before the `core`
/// flag existed still get `core = true` for built-in names.
fn coerce_core(mut record: AppRecord) -> AppRecord {
    if is_core_app(&record.name) {
        record.core = true;
    }
    record
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
