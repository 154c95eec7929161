//! Shard consolidation: merge duplicate broker-state shards into one.
//!
//! A full backup snapshot is persisted before any mutation; it is the sole
//! recovery path if a later step fails destructively. Any remote failure
//! after that point is fatal and leaves partially migrated state behind.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::backup::{self, BackupError, Snapshot};
use crate::store::{STATE_SHARD_NAME, StateStore, StoreError};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(
        "value `{name}` exists in both shard {existing_shard} (value {existing_value}) and \
         shard {duplicate_shard} (value {duplicate_value}); resolve by hand and re-run"
    )]
    Collision {
        name: String,
        existing_shard: String,
        existing_value: String,
        duplicate_shard: String,
        duplicate_value: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Backup(#[from] BackupError),
}

/// Summary of a merge run.
#[derive(Debug, Default, Clone)]
pub struct MergeReport {
    /// Shards found carrying the reserved name.
    pub state_shards: usize,
    /// Id of the chosen target shard, when a merge happened.
    pub target: Option<String>,
    pub migrated_values: usize,
    pub deleted_shards: usize,
    pub backup_path: Option<PathBuf>,
}

/// Merge all duplicate broker-state shards into one.
///
/// Target selection is deterministic: the shard with the lexicographically
/// smallest id. Listing order from the remote store is not stable, so it is
/// never used for selection.
///
/// Collisions are detected against the backup snapshot before the first
/// mutation; a colliding name aborts the run with both locations named.
///
/// The snapshot file is written even when the store is wrapped in a
/// dry-run decorator: the write is local, touches nothing remote, and
/// keeps rehearsal output byte-for-byte comparable with a live run.
pub fn merge_shards(
    store: &dyn StateStore,
    project_id: &str,
    backup_dir: &Path,
) -> Result<MergeReport, ReconcileError> {
    let mut report = MergeReport::default();

    tracing::info!(project = %project_id, "listing shards");
    let shards = store.list_shards(project_id)?;
    tracing::info!(count = shards.len(), "found shards");

    let mut state_shards: Vec<_> = shards
        .into_iter()
        .filter(|s| s.name == STATE_SHARD_NAME)
        .collect();
    for shard in &state_shards {
        tracing::info!(shard = %shard.id, client_app = %shard.client_app_id, "state shard");
    }
    report.state_shards = state_shards.len();

    if state_shards.len() <= 1 {
        tracing::info!("nothing to do");
        return Ok(report);
    }

    // Deterministic target: smallest shard id.
    state_shards.sort_by(|a, b| a.id.cmp(&b.id));
    let target = state_shards[0].clone();
    tracing::info!(target = %target.id, client_app = %target.client_app_id, "selected target shard");
    report.target = Some(target.id.clone());

    let snapshot = Snapshot::capture(store, project_id, &state_shards)?;
    let path = backup::backup_path(backup_dir);
    tracing::info!(path = %path.display(), values = snapshot.len(), "saving backup");
    snapshot.save(&path)?;
    report.backup_path = Some(path);

    // Collision pre-pass across the whole snapshot: nothing is mutated if
    // any value name resolves to more than one live entry.
    let empty = Default::default();
    let target_values = snapshot.0.get(&target.id).unwrap_or(&empty);
    let mut seen: std::collections::BTreeMap<&str, (&str, &str)> = target_values
        .values()
        .map(|v| (v.name.as_str(), (target.id.as_str(), v.id.as_str())))
        .collect();
    for (shard_id, values) in &snapshot.0 {
        if shard_id == &target.id {
            continue;
        }
        for value in values.values() {
            if let Some((existing_shard, existing_value)) = seen.get(value.name.as_str()) {
                return Err(ReconcileError::Collision {
                    name: value.name.clone(),
                    existing_shard: existing_shard.to_string(),
                    existing_value: existing_value.to_string(),
                    duplicate_shard: shard_id.clone(),
                    duplicate_value: value.id.clone(),
                });
            }
            seen.insert(&value.name, (shard_id, &value.id));
        }
    }

    for (shard_id, values) in &snapshot.0 {
        if shard_id == &target.id {
            continue;
        }
        tracing::info!(source = %shard_id, target = %target.id, "migrating values");

        for value in values.values() {
            tracing::info!(value = %value.name, target = %target.id, "creating value in target");
            let mut migrated = value.clone();
            migrated.id = String::new();
            store.create_value(project_id, &target.id, &migrated)?;

            tracing::info!(value = %value.name, source = %shard_id, "deleting value from source");
            store.delete_value(project_id, shard_id, &value.id)?;
            report.migrated_values += 1;
        }

        tracing::info!(shard = %shard_id, "deleting drained shard");
        store.delete_shard(project_id, shard_id)?;
        report.deleted_shards += 1;
    }

    tracing::info!(target = %target.id, migrated = report.migrated_values, "merge complete");
    Ok(report)
}
