//! File-backed key-value storage area.
//!
//! Models the persistent storage area the engine writes into: a string-keyed
//! map of string values, serialized as one JSON object and rewritten
//! atomically on every persist. The note collection lives under a single
//! well-known key; export and import move the whole area at once.

use std::{
    collections::BTreeMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};
use tempfile::NamedTempFile;

use crate::{JotterError, Result};

/// A persistent string-keyed storage area held in a single JSON file.
#[derive(Debug)]
pub struct StorageArea {
    /// Backing file for the area
    path: PathBuf,

    /// Current contents, authoritative between persists
    entries: BTreeMap<String, String>,
}

impl StorageArea {
    /// Opens the area at `path`. An absent or unparseable file yields an
    /// empty area; load corruption is never an error to the caller.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(entries) => {
                    debug!("Loaded {} keys from {}", entries.len(), path.display());
                    entries
                }
                Err(e) => {
                    warn!(
                        "Storage area {} is corrupt, starting empty: {}",
                        path.display(),
                        e
                    );
                    BTreeMap::new()
                }
            },
            Err(e) => {
                debug!(
                    "Storage area {} not readable, starting empty: {}",
                    path.display(),
                    e
                );
                BTreeMap::new()
            }
        };

        Self { path, entries }
    }

    /// Returns the value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Sets a key and persists the whole area.
    pub fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        self.persist()
    }

    /// Atomically rewrites the backing file with the full serialized map.
    /// A failed write leaves the previously persisted file intact.
    pub fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp_file = NamedTempFile::new_in(dir)?;

        let json = serde_json::to_string_pretty(&self.entries)?;
        temp_file.write_all(json.as_bytes())?;
        temp_file.flush()?;

        temp_file
            .persist(&self.path)
            .map_err(|e| JotterError::Io(e.error))?;

        debug!("Persisted storage area to {}", self.path.display());
        Ok(())
    }

    /// Dumps every key to a snapshot file.
    pub fn export_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(path, json)?;
        info!(
            "Exported {} keys to snapshot {}",
            self.entries.len(),
            path.display()
        );
        Ok(())
    }

    /// Restores the area from a previously exported snapshot, re-populating
    /// every key in the snapshot verbatim. A malformed snapshot is rejected
    /// with the area left untouched.
    pub fn import_from(&mut self, path: &Path) -> Result<()> {
        let raw = fs::read_to_string(path).map_err(|e| JotterError::ImportRejected {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;

        let snapshot: BTreeMap<String, String> =
            serde_json::from_str(&raw).map_err(|e| JotterError::ImportRejected {
                message: format!("{} is not a storage snapshot: {}", path.display(), e),
            })?;

        let imported = snapshot.len();
        self.entries.extend(snapshot);
        self.persist()?;

        info!("Imported {} keys from snapshot {}", imported, path.display());
        Ok(())
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn absent_file_loads_as_an_empty_area() {
        let dir = TempDir::new().unwrap();
        let area = StorageArea::load(dir.path().join("missing.json"));
        assert_eq!(area.get("notes"), None);
    }

    #[test]
    fn corrupt_file_loads_as_an_empty_area() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, "{ not json").unwrap();

        let area = StorageArea::load(&path);
        assert_eq!(area.get("notes"), None);
    }

    #[test]
    fn set_persists_and_survives_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");

        let mut area = StorageArea::load(&path);
        area.set("notes", "[1,2,3]".to_string()).unwrap();

        let reloaded = StorageArea::load(&path);
        assert_eq!(reloaded.get("notes"), Some("[1,2,3]"));
    }

    #[test]
    fn export_then_import_round_trips_every_key() {
        let dir = TempDir::new().unwrap();
        let mut area = StorageArea::load(dir.path().join("data.json"));
        area.set("notes", "[]".to_string()).unwrap();
        area.set("theme", "dark".to_string()).unwrap();

        let snapshot = dir.path().join("backup.json");
        area.export_to(&snapshot).unwrap();

        let mut restored = StorageArea::load(dir.path().join("other.json"));
        restored.import_from(&snapshot).unwrap();
        assert_eq!(restored.get("notes"), Some("[]"));
        assert_eq!(restored.get("theme"), Some("dark"));
    }

    #[test]
    fn malformed_import_is_rejected_without_touching_state() {
        let dir = TempDir::new().unwrap();
        let mut area = StorageArea::load(dir.path().join("data.json"));
        area.set("notes", "[]".to_string()).unwrap();

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "not a snapshot").unwrap();

        let err = area.import_from(&bad).unwrap_err();
        assert!(matches!(err, JotterError::ImportRejected { .. }));
        assert_eq!(area.get("notes"), Some("[]"));

        let reloaded = StorageArea::load(area.path());
        assert_eq!(reloaded.get("notes"), Some("[]"));
    }
}
