//! Dry-run decorator over a [`StateStore`].
//!
//! Reads are forwarded; mutations are logged, recorded and skipped. A run
//! routed through this wrapper makes exactly the same decisions as a live
//! run while issuing zero mutating calls.

use std::sync::Mutex;

use super::{Shard, StateStore, StoreError, Value, ValueSummary};

/// A mutation the wrapped run would have performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedOp {
    CreateValue { shard: String, name: String },
    DeleteValue { shard: String, value: String },
    DeleteShard { shard: String },
}

pub struct DryRun<S> {
    inner: S,
    planned: Mutex<Vec<PlannedOp>>,
}

impl<S> DryRun<S> {
    pub fn new(inner: S) -> Self {
        DryRun {
            inner,
            planned: Mutex::new(Vec::new()),
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// The mutations recorded so far, in call order.
    pub fn planned(&self) -> Vec<PlannedOp> {
        self.planned
            .lock()
            .map(|ops| ops.clone())
            .unwrap_or_default()
    }

    fn record(&self, op: PlannedOp) {
        if let Ok(mut ops) = self.planned.lock() {
            ops.push(op);
        }
    }
}

impl<S: StateStore> StateStore for DryRun<S> {
    fn list_shards(&self, project_id: &str) -> Result<Vec<Shard>, StoreError> {
        self.inner.list_shards(project_id)
    }

    fn list_values(
        &self,
        project_id: &str,
        shard_id: &str,
    ) -> Result<Vec<ValueSummary>, StoreError> {
        self.inner.list_values(project_id, shard_id)
    }

    fn get_value(
        &self,
        project_id: &str,
        shard_id: &str,
        value_id: &str,
    ) -> Result<Value, StoreError> {
        self.inner.get_value(project_id, shard_id, value_id)
    }

    fn create_value(
        &self,
        _project_id: &str,
        shard_id: &str,
        value: &Value,
    ) -> Result<Value, StoreError> {
        tracing::info!(shard = %shard_id, name = %value.name, "dry run: would create value");
        self.record(PlannedOp::CreateValue {
            shard: shard_id.to_string(),
            name: value.name.clone(),
        });
        Ok(value.clone())
    }

    fn delete_value(
        &self,
        _project_id: &str,
        shard_id: &str,
        value_id: &str,
    ) -> Result<(), StoreError> {
        tracing::info!(shard = %shard_id, value = %value_id, "dry run: would delete value");
        self.record(PlannedOp::DeleteValue {
            shard: shard_id.to_string(),
            value: value_id.to_string(),
        });
        Ok(())
    }

    fn delete_shard(&self, _project_id: &str, shard_id: &str) -> Result<(), StoreError> {
        tracing::info!(shard = %shard_id, "dry run: would delete shard");
        self.record(PlannedOp::DeleteShard {
            shard: shard_id.to_string(),
        });
        Ok(())
    }
}
