//! Local record store
//!
//! A JSON file mapping resource names to the last persisted
//! [`PipelineRecord`]. Writes go to a sibling temp file first and are then
//! renamed over the original, so a crash never leaves a half-written store.

use chrono::{DateTime, Utc};
use conduit_core::domain::pipeline::PipelineRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::diagnostics::Disposition;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read state file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write state file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("state file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A record plus the time it was last written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub record: PipelineRecord,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    records: BTreeMap<String, StoredRecord>,
}

/// In-memory view of the state file
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    records: BTreeMap<String, StoredRecord>,
}

impl RecordStore {
    /// Load the store at `path`; a missing file is an empty store
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => {
                let file: StoreFile = serde_json::from_str(&contents).map_err(|source| {
                    StoreError::Corrupt {
                        path: path.clone(),
                        source,
                    }
                })?;
                file.records
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Read { path, source }),
        };

        debug!("Loaded {} record(s) from {}", records.len(), path.display());
        Ok(Self { path, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<&StoredRecord> {
        self.records.get(name)
    }

    pub fn put(&mut self, name: impl Into<String>, record: PipelineRecord) {
        self.records.insert(
            name.into(),
            StoredRecord {
                record,
                updated_at: Utc::now(),
            },
        );
    }

    pub fn remove(&mut self, name: &str) -> Option<StoredRecord> {
        self.records.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StoredRecord)> {
        self.records.iter().map(|(name, stored)| (name.as_str(), stored))
    }

    /// Apply an operation's disposition to `name`
    ///
    /// Returns whether the store changed and needs saving.
    pub fn apply(&mut self, name: &str, disposition: &Disposition) -> bool {
        match disposition {
            Disposition::Persist(record) => {
                self.put(name, record.clone());
                true
            }
            Disposition::Remove => self.remove(name).is_some(),
            Disposition::Unchanged => false,
        }
    }

    /// Write the store back to its file
    pub fn save(&self) -> Result<()> {
        let file = StoreFile {
            records: self.records.clone(),
        };
        let contents = serde_json::to_string_pretty(&file)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, contents).map_err(|source| StoreError::Write {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;

        debug!("Saved {} record(s) to {}", self.records.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(id: &str) -> PipelineRecord {
        PipelineRecord {
            id: id.to_string(),
            cluster_api_url: Some("https://api.c-1.example.com".to_string()),
            display_name: "ingest".to_string(),
            state: "running".to_string(),
            allow_deletion: Some(true),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = RecordStore::load(dir.path().join("state.json")).unwrap();
        assert_eq!(store.names().count(), 0);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut store = RecordStore::load(&path).unwrap();
        store.put("ingest", record("p-1"));
        store.put("egress", record("p-2"));
        store.save().unwrap();

        let reloaded = RecordStore::load(&path).unwrap();
        assert_eq!(reloaded.names().collect::<Vec<_>>(), vec!["egress", "ingest"]);
        assert_eq!(reloaded.get("ingest").unwrap().record, record("p-1"));
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[test]
    fn test_apply_dispositions() {
        let dir = tempdir().unwrap();
        let mut store = RecordStore::load(dir.path().join("state.json")).unwrap();

        assert!(store.apply("ingest", &Disposition::Persist(record("p-1"))));
        assert!(store.get("ingest").is_some());

        assert!(!store.apply("ingest", &Disposition::Unchanged));
        assert!(store.get("ingest").is_some());

        assert!(store.apply("ingest", &Disposition::Remove));
        assert!(store.get("ingest").is_none());
        assert!(!store.apply("ingest", &Disposition::Remove));
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();

        let err = RecordStore::load(&path).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }
}
