//! Authoritative check table.
//!
//! Readers always receive deep copies, so a record they hold can never change
//! underneath them. Writers replace whole records under the table lock, so no
//! reader ever observes a half-written record. Persistence is explicit: the
//! table is only written to disk by [`CheckStore::snapshot`].

use crate::id::CheckId;
use crate::types::Check;
use common::{Error, Result};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Default upper bound on the number of checks.
pub const MAX_CHECKS: usize = 100;

/// Point-in-time copy of the whole table.
pub type CheckMap = BTreeMap<CheckId, Check>;

/// Result of loading a snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Records now in the table
    pub loaded: usize,
    /// Records dropped for a malformed id or schema
    pub skipped: usize,
}

/// Check table shared by the scheduler, in-flight probes and API readers.
pub struct CheckStore {
    checks: RwLock<CheckMap>,
    capacity: usize,
    persist_lock: Mutex<()>,
}

impl Default for CheckStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckStore {
    /// Create an empty store holding at most [`MAX_CHECKS`] checks.
    pub fn new() -> Self {
        Self::with_capacity(MAX_CHECKS)
    }

    /// Create an empty store holding at most `capacity` checks.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            checks: RwLock::new(BTreeMap::new()),
            capacity,
            persist_lock: Mutex::new(()),
        }
    }

    // A panic while holding the lock cannot leave a record half-written
    // (records are swapped whole), so a poisoned lock is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, CheckMap> {
        self.checks.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CheckMap> {
        self.checks.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Replace the table with the snapshot stored at `path`.
    ///
    /// A missing file is an empty table.
    pub async fn load(&self, path: impl AsRef<Path>) -> Result<LoadReport> {
        let path = path.as_ref();
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "No snapshot found, starting with an empty table");
                String::new()
            }
            Err(e) => {
                return Err(Error::persistence(format!(
                    "Checks could not be read from '{}': {}",
                    path.display(),
                    e
                )));
            }
        };

        let report = self.load_str(&contents)?;
        info!(
            path = %path.display(),
            loaded = report.loaded,
            skipped = report.skipped,
            "Checks have been loaded in memory"
        );
        Ok(report)
    }

    /// Replace the table with the serialized snapshot in `contents`.
    ///
    /// Records with a malformed id or fields outside the check schema are
    /// skipped. Fails with [`Error::Capacity`] when the remaining records do
    /// not fit, leaving the current table untouched.
    pub fn load_str(&self, contents: &str) -> Result<LoadReport> {
        let mut report = LoadReport::default();
        let mut table = CheckMap::new();

        if !contents.trim().is_empty() {
            let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_str(contents)
                .map_err(|e| Error::persistence(format!("Snapshot is not a JSON object: {}", e)))?;

            for (key, value) in raw {
                let id = match CheckId::parse(&key) {
                    Ok(id) => id,
                    Err(e) => {
                        warn!(id = %key, error = %e, "Skipping snapshot record");
                        report.skipped += 1;
                        continue;
                    }
                };
                match serde_json::from_value::<Check>(value) {
                    Ok(check) => {
                        table.insert(id, check);
                    }
                    Err(e) => {
                        warn!(id = %key, error = %e, "Skipping snapshot record with invalid fields");
                        report.skipped += 1;
                    }
                }
            }
        }

        if table.len() > self.capacity {
            return Err(Error::Capacity(self.capacity));
        }

        report.loaded = table.len();
        *self.write() = table;
        Ok(report)
    }

    /// Serialize the whole table to `path`.
    ///
    /// The snapshot is written to a sibling temporary file and renamed into
    /// place. On failure the in-memory table is untouched.
    pub async fn snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let _guard = self.persist_lock.lock().await;

        let json = {
            let checks = self.read();
            serde_json::to_vec(&*checks)
                .map_err(|e| Error::persistence(format!("Checks could not be serialized: {}", e)))?
        };

        let write_err = |e: std::io::Error| {
            Error::persistence(format!(
                "Checks could not be written to '{}': {}",
                path.display(),
                e
            ))
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        let tmp = temp_path(path);
        tokio::fs::write(&tmp, &json).await.map_err(write_err)?;
        tokio::fs::rename(&tmp, path).await.map_err(write_err)?;

        debug!(path = %path.display(), bytes = json.len(), "Checks have been written to disk");
        Ok(())
    }

    /// Deep copy of one check.
    pub fn get(&self, id: &CheckId) -> Option<Check> {
        self.read().get(id).cloned()
    }

    /// Deep copy of every check.
    pub fn list(&self) -> CheckMap {
        self.read().clone()
    }

    /// Add a new check.
    pub fn insert(&self, id: CheckId, check: Check) -> Result<()> {
        let mut checks = self.write();
        if checks.len() >= self.capacity {
            return Err(Error::Capacity(self.capacity));
        }
        if checks.contains_key(&id) {
            return Err(Error::DuplicateId(id.to_string()));
        }
        checks.insert(id, check);
        Ok(())
    }

    /// Replace an existing check wholesale.
    pub fn update(&self, id: &CheckId, check: Check) -> Result<()> {
        match self.write().get_mut(id) {
            Some(slot) => {
                *slot = check;
                Ok(())
            }
            None => Err(Error::not_found(id)),
        }
    }

    /// Remove a check.
    pub fn delete(&self, id: &CheckId) -> Result<()> {
        self.write()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(id))
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
