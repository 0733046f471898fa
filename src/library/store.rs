//! Persisted key → record table.
//!
//! Stored as a single pretty-printed JSON object keyed by content id, in
//! the same shape as the probe output (`Key -> {File, Width, ...}`). Keys are
//! kept in a `BTreeMap` so an unchanged library always saves to the same
//! bytes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use super::view::LibraryView;
use crate::core::executor::write_text_atomic;
use crate::domain::{LibraryRecord, MetricsMap};

/// In-memory library table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "MetricsMap", into = "MetricsMap")]
pub struct Library {
    records: BTreeMap<String, LibraryRecord>,
}

impl From<MetricsMap> for Library {
    fn from(map: MetricsMap) -> Self {
        let records = map
            .into_iter()
            .map(|(key, metrics)| (key.clone(), LibraryRecord::new(key, metrics)))
            .collect();
        Self { records }
    }
}

impl From<Library> for MetricsMap {
    fn from(library: Library) -> Self {
        library
            .records
            .into_iter()
            .map(|(key, record)| (key, record.metrics))
            .collect()
    }
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::new());
        }
        serde_json::from_str(content).context("Failed to parse library JSON")
    }

    /// Deterministic JSON rendering (sorted keys, trailing newline)
    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self).context("Failed to serialize library")?;
        json.push('\n');
        Ok(json)
    }

    pub fn get(&self, key: &str) -> Option<&LibraryRecord> {
        self.records.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    /// Insert or replace the record for its key (last write wins).
    /// Returns the replaced record.
    pub fn upsert(&mut self, record: LibraryRecord) -> Option<LibraryRecord> {
        self.records.insert(record.key.clone(), record)
    }

    /// Records in key order
    pub fn iter(&self) -> impl Iterator<Item = &LibraryRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop records whose canonical path no longer exists.
    /// Returns the pruned library and the removed records.
    pub fn prune(self, view: &dyn LibraryView) -> (Self, Vec<LibraryRecord>) {
        let (kept, removed): (Vec<_>, Vec<_>) = self
            .records
            .into_values()
            .partition(|record| view.exists(record.canonical_path()));

        for record in &removed {
            debug!(key = %record.key, path = %record.canonical_path().display(), "Pruning stale record");
        }

        let records = kept.into_iter().map(|r| (r.key.clone(), r)).collect();
        (Self { records }, removed)
    }
}

/// File-backed store for a [`Library`]
#[derive(Debug, Clone)]
pub struct MetadataStore {
    path: PathBuf,
}

impl MetadataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the configured default location ($CURATOR_HOME/library.json)
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(crate::config::paths::library_store()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the library. A missing file is an empty library, not an error.
    pub async fn load(&self) -> Result<Library> {
        load(&self.path).await
    }

    pub async fn save(&self, library: &Library) -> Result<()> {
        save(library, &self.path).await
    }
}

/// Load a library from `path`; missing or empty files yield an empty library.
pub async fn load(path: &Path) -> Result<Library> {
    if !path.exists() {
        debug!(path = %path.display(), "No library file, starting empty");
        return Ok(Library::new());
    }

    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read library: {}", path.display()))?;

    Library::from_json(&content).with_context(|| format!("Invalid library file: {}", path.display()))
}

/// Save a library atomically.
pub async fn save(library: &Library, path: &Path) -> Result<()> {
    let content = library.to_json()?;
    write_text_atomic(path, &content)
        .await
        .with_context(|| format!("Failed to write library: {}", path.display()))?;

    info!(path = %path.display(), records = library.len(), "Library saved");
    Ok(())
}
