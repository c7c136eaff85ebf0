//! Captured command output shared across concurrently running jobs.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

/// Append/overwrite map from operation key to captured output text.
///
/// One store is shared by every job of a build run (wrap it in an `Arc`).
/// The lock is held only for a single map operation, never across an
/// external process call. A retried operation replaces its earlier entry;
/// entries are never removed while the run is live. Auditing reads them
/// afterwards through [`OutputStore::snapshot`].
#[derive(Debug, Default)]
pub struct OutputStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl OutputStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `output` under `key`, replacing any earlier entry. Returns the
    /// replaced output, if any.
    pub fn record(&self, key: impl Into<String>, output: impl Into<String>) -> Option<String> {
        let key = key.into();
        let output = output.into();
        let bytes = output.len();
        let previous = self.lock().insert(key.clone(), output);
        match &previous {
            Some(old) => debug!(key = %key, bytes, replaced_bytes = old.len(), "replaced recorded output"),
            None => debug!(key = %key, bytes, "recorded output"),
        }
        previous
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of every entry, ordered by key.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.lock().clone()
    }

    /// Pretty JSON object of every entry, for audit logs.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.snapshot())
    }

    // Entries are plain strings, so a panic mid-insert cannot leave the map
    // in a state worth refusing to read.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
