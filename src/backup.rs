//! Point-in-time backup snapshots of shard values.
//!
//! A snapshot maps shard id to (value name -> full value). It is written
//! before any destructive merge step and is the sole recovery path if a
//! later step fails; the repair run reads it back as its input.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{Shard, StateStore, StoreError, Value};

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("cannot write backup file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot read backup file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("backup file {path} is not a valid snapshot: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// shard id -> (value name -> value)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(pub BTreeMap<String, BTreeMap<String, Value>>);

impl Snapshot {
    /// Fetch every full value of every given shard.
    pub fn capture(
        store: &dyn StateStore,
        project_id: &str,
        shards: &[Shard],
    ) -> Result<Snapshot, BackupError> {
        let mut mapping = BTreeMap::new();
        for shard in shards {
            tracing::info!(shard = %shard.id, "fetching values for backup");
            let summaries = store.list_values(project_id, &shard.id)?;
            tracing::info!(shard = %shard.id, count = summaries.len(), "got value listing");

            let mut by_name = BTreeMap::new();
            for summary in &summaries {
                let full = store.get_value(project_id, &shard.id, &summary.id)?;
                by_name.insert(full.name.clone(), full);
            }
            mapping.insert(shard.id.clone(), by_name);
        }
        Ok(Snapshot(mapping))
    }

    /// Write the snapshot as indented JSON.
    pub fn save(&self, path: &Path) -> Result<(), BackupError> {
        let data = serde_json::to_vec_pretty(self).map_err(|source| BackupError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, data).map_err(|source| BackupError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Snapshot, BackupError> {
        let data = fs::read(path).map_err(|source| BackupError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&data).map_err(|source| BackupError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Total number of values across all shards.
    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Timestamped backup filename, unique per run at nanosecond granularity.
pub fn backup_path(dir: &Path) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.join(format!("data_backup.{nanos}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_survives_save_and_load() {
        let mut by_name = BTreeMap::new();
        by_name.insert(
            "inst-1".to_string(),
            Value {
                id: "value-0001".to_string(),
                name: "inst-1".to_string(),
                value: json!({ "plan_id": "p" }),
            },
        );
        let mut mapping = BTreeMap::new();
        mapping.insert("shard-0001".to_string(), by_name);
        let snapshot = Snapshot(mapping);

        let dir = tempfile::tempdir().expect("tempdir");
        let path = backup_path(dir.path());
        snapshot.save(&path).expect("save");
        let loaded = Snapshot::load(&path).expect("load");
        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn backup_filename_is_timestamped() {
        let path = backup_path(Path::new("/tmp"));
        let name = path.file_name().and_then(|n| n.to_str()).expect("name");
        assert!(name.starts_with("data_backup."));
        assert!(name.ends_with(".json"));
    }
}
