//! Remote state-store types and the client seam.
//!
//! The store holds named shards; each shard holds named values. Everything
//! that mutates broker state goes through the [`StateStore`] trait so runs
//! can be rehearsed against [`DryRun`] or tested against [`MemoryStore`].

mod dry_run;
mod http;
mod memory;

pub use dry_run::{DryRun, PlannedOp};
pub use http::HttpStateStore;
pub use memory::{MemoryStore, StoreCall};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reserved name of the shard(s) holding broker state. More than one shard
/// with this name is the duplication bug the merge run resolves.
pub const STATE_SHARD_NAME: &str = "broker-state";

/// A named remote container of values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shard {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub client_app_id: String,
}

/// A value as returned by shard listings: name and id only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

/// A full value: the payload is an arbitrary JSON document. The literal
/// JSON `null` payload marks a corrupted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    pub value: serde_json::Value,
}

impl Value {
    /// A new, not-yet-stored value (the store assigns the id on create).
    pub fn new(name: impl Into<String>, value: serde_json::Value) -> Self {
        Value {
            id: String::new(),
            name: name.into(),
            value,
        }
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }
}

/// Remote-store failures, with enough context (shard id, value name or id,
/// operation) for manual follow-up.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("auth handshake failed: {reason}")]
    Auth { reason: String },

    #[error("cannot list shards in project {project}: {reason}")]
    ListShards { project: String, reason: String },

    #[error("cannot list values in shard {shard}: {reason}")]
    ListValues { shard: String, reason: String },

    #[error("cannot fetch value {value} from shard {shard}: {reason}")]
    GetValue {
        shard: String,
        value: String,
        reason: String,
    },

    #[error("cannot create value `{name}` in shard {shard}: {reason}")]
    CreateValue {
        shard: String,
        name: String,
        reason: String,
    },

    #[error("cannot delete value {value} from shard {shard}: {reason}")]
    DeleteValue {
        shard: String,
        value: String,
        reason: String,
    },

    #[error("cannot delete shard {shard}: {reason}")]
    DeleteShard { shard: String, reason: String },
}

/// Administrative client for the remote state store.
///
/// Implementations must be shareable across the partitioned conversion
/// workers, hence the `Send + Sync` bound.
pub trait StateStore: Send + Sync {
    fn list_shards(&self, project_id: &str) -> Result<Vec<Shard>, StoreError>;

    fn list_values(&self, project_id: &str, shard_id: &str)
    -> Result<Vec<ValueSummary>, StoreError>;

    fn get_value(
        &self,
        project_id: &str,
        shard_id: &str,
        value_id: &str,
    ) -> Result<Value, StoreError>;

    fn create_value(
        &self,
        project_id: &str,
        shard_id: &str,
        value: &Value,
    ) -> Result<Value, StoreError>;

    fn delete_value(
        &self,
        project_id: &str,
        shard_id: &str,
        value_id: &str,
    ) -> Result<(), StoreError>;

    fn delete_shard(&self, project_id: &str, shard_id: &str) -> Result<(), StoreError>;
}
