//! Parallel value conversion and stale-value cleanup.
//!
//! The value list is split into contiguous ranges, one worker thread per
//! range. Workers share only the store handle and the read-only retain
//! list; no two workers ever touch the same value, so no locking is needed
//! beyond what the store itself does.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use thiserror::Error;

use crate::model::{InstanceDetailsSpec, Params};
use crate::plan::{decode_legacy, encode_plan};
use crate::store::{STATE_SHARD_NAME, StateStore, StoreError, Value, ValueSummary};

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("found {count} broker-state shards in project {project}; run merge first")]
    UnmergedShards { project: String, count: usize },

    #[error("no broker-state shard exists in project {project}")]
    NoStateShard { project: String },

    #[error("cannot read instance list {path}: {reason}")]
    RetainList { path: PathBuf, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Options for a conversion pass.
#[derive(Debug, Default, Clone)]
pub struct ConvertOptions {
    /// When set, values whose name is absent from this list are deleted as
    /// stale. When unset, nothing is deleted for staleness.
    pub retain: Option<BTreeSet<String>>,
    /// Worker count override; defaults to available parallelism.
    pub workers: Option<usize>,
}

/// Per-pass counters, merged across workers after the join.
#[derive(Debug, Default, Clone)]
pub struct ConvertReport {
    pub scanned: usize,
    pub converted: usize,
    pub canonical: usize,
    pub unrecognized: usize,
    pub stale_removed: usize,
    pub failed: usize,
}

impl ConvertReport {
    fn merge(&mut self, other: &ConvertReport) {
        self.scanned += other.scanned;
        self.converted += other.converted;
        self.canonical += other.canonical;
        self.unrecognized += other.unrecognized;
        self.stale_removed += other.stale_removed;
        self.failed += other.failed;
    }
}

/// Load a retain list: a JSON array of instance identifiers.
pub fn load_retain_list(path: &Path) -> Result<BTreeSet<String>, ConvertError> {
    let data = fs::read(path).map_err(|e| ConvertError::RetainList {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let ids: Vec<String> = serde_json::from_slice(&data).map_err(|e| ConvertError::RetainList {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(ids.into_iter().collect())
}

/// Convert every legacy-format value in the single broker-state shard to
/// the canonical encoding, deleting stale values when a retain list is
/// configured.
pub fn convert_values(
    store: &dyn StateStore,
    project_id: &str,
    opts: &ConvertOptions,
) -> Result<ConvertReport, ConvertError> {
    let cleanup = opts.retain.is_some();
    if cleanup {
        tracing::warn!("cleanup mode enabled: values absent from the retain list will be deleted");
    }

    tracing::info!(project = %project_id, "listing shards");
    let shards = store.list_shards(project_id)?;
    let state_shards: Vec<_> = shards
        .into_iter()
        .filter(|s| s.name == STATE_SHARD_NAME)
        .collect();

    let shard = match state_shards.as_slice() {
        [] => {
            return Err(ConvertError::NoStateShard {
                project: project_id.to_string(),
            });
        }
        [only] => only.clone(),
        many => {
            return Err(ConvertError::UnmergedShards {
                project: project_id.to_string(),
                count: many.len(),
            });
        }
    };

    tracing::info!(shard = %shard.id, "listing values");
    let values = store.list_values(project_id, &shard.id)?;
    tracing::info!(count = values.len(), "got values");

    if values.is_empty() {
        return Ok(ConvertReport::default());
    }

    let workers = opts
        .workers
        .unwrap_or_else(|| thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
        .max(1);
    let chunk = values.len().div_ceil(workers).max(1);

    let mut report = ConvertReport::default();
    thread::scope(|scope| {
        let mut handles = Vec::new();
        for part in values.chunks(chunk) {
            let shard_id = shard.id.as_str();
            handles.push(
                scope.spawn(move || convert_partition(store, project_id, shard_id, part, opts)),
            );
        }
        for handle in handles {
            match handle.join() {
                Ok(part_report) => report.merge(&part_report),
                // A panicked worker is counted against its whole range.
                Err(_) => report.failed += 1,
            }
        }
    });

    tracing::info!(
        scanned = report.scanned,
        converted = report.converted,
        canonical = report.canonical,
        unrecognized = report.unrecognized,
        stale_removed = report.stale_removed,
        failed = report.failed,
        "conversion pass finished"
    );
    Ok(report)
}

/// Process one contiguous range of values.
///
/// Per-item failures are logged and skipped. The exception is a create
/// failure after the matching delete succeeded: the old copy is already
/// gone and the target may be inconsistent, so the whole partition stops.
fn convert_partition(
    store: &dyn StateStore,
    project_id: &str,
    shard_id: &str,
    part: &[ValueSummary],
    opts: &ConvertOptions,
) -> ConvertReport {
    let mut report = ConvertReport::default();

    for summary in part {
        report.scanned += 1;

        tracing::info!(value = %summary.name, id = %summary.id, "fetching value");
        let full = match store.get_value(project_id, shard_id, &summary.id) {
            Ok(full) => full,
            Err(e) => {
                tracing::error!(value = %summary.name, error = %e, "cannot fetch value");
                report.failed += 1;
                continue;
            }
        };

        if let Some(retain) = &opts.retain {
            if !retain.contains(&full.name) {
                tracing::warn!(value = %full.name, "value not in retain list, removing");
                if let Err(e) = store.delete_value(project_id, shard_id, &full.id) {
                    tracing::error!(value = %full.name, error = %e, "cannot delete stale value");
                    report.failed += 1;
                    continue;
                }
                report.stale_removed += 1;
                continue;
            }
        }

        let spec: InstanceDetailsSpec = match serde_json::from_value(full.value.clone()) {
            Ok(spec) => spec,
            Err(e) => {
                tracing::error!(value = %full.name, error = %e, "cannot decode value payload");
                report.failed += 1;
                continue;
            }
        };

        // Classification is re-derived per value, never cached: another
        // operator may have converted it since the listing.
        match spec.params() {
            Params::Canonical(_) => {
                tracing::info!(value = %full.name, "already canonical, skipping");
                report.canonical += 1;
            }
            Params::Legacy(map) => {
                tracing::warn!(value = %full.name, "legacy format, converting");
                match convert_one(store, project_id, shard_id, &full, &spec, &map) {
                    Ok(()) => report.converted += 1,
                    Err(ConvertStop::Item(reason)) => {
                        tracing::error!(value = %full.name, error = %reason, "conversion failed");
                        report.failed += 1;
                    }
                    Err(ConvertStop::Partition(reason)) => {
                        tracing::error!(
                            value = %full.name,
                            error = %reason,
                            "create failed after delete; stopping this partition"
                        );
                        report.failed += 1;
                        return report;
                    }
                }
            }
            Params::Unrecognized(raw) => {
                tracing::warn!(
                    value = %full.name,
                    shape = %raw,
                    "unexpected parameters shape, leaving untouched"
                );
                report.unrecognized += 1;
            }
        }
    }

    report
}

enum ConvertStop {
    /// Skip this value, keep going.
    Item(String),
    /// Stop the whole partition.
    Partition(String),
}

fn convert_one(
    store: &dyn StateStore,
    project_id: &str,
    shard_id: &str,
    full: &Value,
    spec: &InstanceDetailsSpec,
    map: &serde_json::Map<String, serde_json::Value>,
) -> Result<(), ConvertStop> {
    let plan = decode_legacy(map).map_err(|e| ConvertStop::Item(e.to_string()))?;
    let encoded = encode_plan(&plan).map_err(|e| ConvertStop::Item(e.to_string()))?;

    let mut fixed = spec.clone();
    fixed.parameters = serde_json::Value::String(encoded);
    let payload = serde_json::to_value(&fixed).map_err(|e| ConvertStop::Item(e.to_string()))?;
    let replacement = Value::new(full.name.clone(), payload);

    tracing::warn!(value = %full.name, "deleting original value");
    store
        .delete_value(project_id, shard_id, &full.id)
        .map_err(|e| ConvertStop::Item(e.to_string()))?;

    tracing::warn!(value = %full.name, "creating converted copy");
    store
        .create_value(project_id, shard_id, &replacement)
        .map_err(|e| ConvertStop::Partition(e.to_string()))?;

    Ok(())
}
