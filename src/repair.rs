//! Null-value repair from rebuilt instance data.
//!
//! Scans live values for the literal `null` payload and replaces each one
//! whose instance data resolved with a reconstructed record. Values are
//! visited in reverse listing order: the store exposes no version field,
//! so whatever it returns last is the best available guess at "latest".

use std::collections::BTreeMap;

use thiserror::Error;

use crate::archive::InstanceData;
use crate::model::InstanceDetailsSpec;
use crate::plan::{CodecError, encode_plan};
use crate::store::{STATE_SHARD_NAME, StateStore, StoreError, Value};

/// Sentinel plan id marking a restored record.
pub const RESTORED_PLAN_ID: &str = "aosb-cluster-plan-template-restored-plan";
/// Sentinel service id marking a restored record.
pub const RESTORED_SERVICE_ID: &str = "aosb-cluster-service-template";

#[derive(Debug, Error)]
pub enum RepairError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("cannot serialize repaired record for `{name}`: {source}")]
    Serialize {
        name: String,
        source: serde_json::Error,
    },
}

/// Summary of a repair run.
#[derive(Debug, Default, Clone)]
pub struct RepairReport {
    pub scanned: usize,
    /// Values that already had a payload.
    pub intact: usize,
    /// Null values with no rebuilt instance data; left untouched.
    pub unmatched: usize,
    pub repaired: usize,
    /// True when the run stopped early in canary mode.
    pub canary_stop: bool,
}

/// Replace null values with reconstructed state.
///
/// A null value is only replaced if instance data for its name resolved;
/// otherwise it is logged and left as-is (backups are known incomplete).
/// The replacement is delete-then-create; a failure on the create leaves
/// the value absent and is fatal, with the backup snapshot as the recovery
/// path. In canary mode the run halts after the first successful repair.
pub fn repair_null_values(
    store: &dyn StateStore,
    project_id: &str,
    instances: &BTreeMap<String, InstanceData>,
    canary: bool,
) -> Result<RepairReport, RepairError> {
    let mut report = RepairReport::default();

    tracing::info!(project = %project_id, "listing shards");
    let shards = store.list_shards(project_id)?;
    let state_shards: Vec<_> = shards
        .into_iter()
        .filter(|s| s.name == STATE_SHARD_NAME)
        .collect();
    tracing::info!(count = state_shards.len(), "found state shards");

    for shard in &state_shards {
        let values = store.list_values(project_id, &shard.id)?;
        tracing::info!(shard = %shard.id, count = values.len(), "got values");

        for summary in values.iter().rev() {
            report.scanned += 1;

            tracing::info!(value = %summary.name, "fetching value");
            let full = store.get_value(project_id, &shard.id, &summary.id)?;

            if !full.is_null() {
                tracing::info!(value = %full.name, "value is not null, skipping");
                report.intact += 1;
                continue;
            }

            tracing::info!(value = %full.name, "found null value");

            let Some(data) = instances.get(&full.name) else {
                tracing::error!(
                    value = %full.name,
                    "null value has no rebuilt instance data (deleted upstream?), continuing"
                );
                report.unmatched += 1;
                continue;
            };

            tracing::info!(
                value = %full.name,
                instance = %data.name,
                dashboard = %data.dashboard_url,
                "repairing from rebuilt data"
            );

            let encoded = encode_plan(&data.plan)?;
            let fixed = InstanceDetailsSpec {
                plan_id: RESTORED_PLAN_ID.to_string(),
                service_id: RESTORED_SERVICE_ID.to_string(),
                dashboard_url: data.dashboard_url.clone(),
                parameters: serde_json::Value::String(encoded),
            };
            let payload =
                serde_json::to_value(&fixed).map_err(|source| RepairError::Serialize {
                    name: full.name.clone(),
                    source,
                })?;
            let replacement = Value::new(full.name.clone(), payload);

            tracing::info!(value = %full.name, "deleting null value");
            store.delete_value(project_id, &shard.id, &full.id)?;

            tracing::info!(value = %full.name, "creating repaired value");
            store.create_value(project_id, &shard.id, &replacement)?;
            report.repaired += 1;

            if canary {
                tracing::info!("canary mode: stopping after first repair");
                report.canary_stop = true;
                return Ok(report);
            }
        }
    }

    tracing::info!(
        scanned = report.scanned,
        repaired = report.repaired,
        unmatched = report.unmatched,
        "repair run finished"
    );
    Ok(report)
}
