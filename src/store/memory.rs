//! In-memory [`StateStore`] used by tests and local rehearsal.
//!
//! Ids are assigned deterministically in insertion order, listings return
//! values in insertion order, and every mutating call is recorded so tests
//! can assert on the exact call sequence.

use std::collections::BTreeMap;
use std::sync::Mutex;

use super::{Shard, StateStore, StoreError, Value, ValueSummary};

/// A mutation applied to the store, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    CreateValue { shard: String, name: String },
    DeleteValue { shard: String, value: String },
    DeleteShard { shard: String },
}

#[derive(Default)]
struct Inner {
    shards: BTreeMap<String, Shard>,
    /// shard id -> values in insertion order
    values: BTreeMap<String, Vec<Value>>,
    calls: Vec<StoreCall>,
    next_shard: u32,
    next_value: u32,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a shard; returns its id. Ids sort in creation order.
    pub fn add_shard(&self, name: &str) -> String {
        let mut inner = self.inner.lock().unwrap();
        inner.next_shard += 1;
        let n = inner.next_shard;
        let id = format!("shard-{:04}", n);
        inner.shards.insert(
            id.clone(),
            Shard {
                id: id.clone(),
                name: name.to_string(),
                client_app_id: format!("client-{:04}", n),
            },
        );
        inner.values.insert(id.clone(), Vec::new());
        id
    }

    /// Seed a value directly (bypasses call recording); returns its id.
    pub fn put_value(&self, shard_id: &str, name: &str, value: serde_json::Value) -> String {
        let mut inner = self.inner.lock().unwrap();
        inner.next_value += 1;
        let id = format!("value-{:04}", inner.next_value);
        let entry = Value {
            id: id.clone(),
            name: name.to_string(),
            value,
        };
        inner.values.entry(shard_id.to_string()).or_default().push(entry);
        id
    }

    /// Recorded mutation sequence.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn shard_ids(&self) -> Vec<String> {
        self.inner.lock().unwrap().shards.keys().cloned().collect()
    }

    pub fn value_by_name(&self, shard_id: &str, name: &str) -> Option<Value> {
        let inner = self.inner.lock().unwrap();
        inner
            .values
            .get(shard_id)?
            .iter()
            .find(|v| v.name == name)
            .cloned()
    }
}

impl StateStore for MemoryStore {
    fn list_shards(&self, _project_id: &str) -> Result<Vec<Shard>, StoreError> {
        Ok(self.inner.lock().unwrap().shards.values().cloned().collect())
    }

    fn list_values(
        &self,
        _project_id: &str,
        shard_id: &str,
    ) -> Result<Vec<ValueSummary>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let values = inner
            .values
            .get(shard_id)
            .ok_or_else(|| StoreError::ListValues {
                shard: shard_id.to_string(),
                reason: "no such shard".to_string(),
            })?;
        Ok(values
            .iter()
            .map(|v| ValueSummary {
                id: v.id.clone(),
                name: v.name.clone(),
            })
            .collect())
    }

    fn get_value(
        &self,
        _project_id: &str,
        shard_id: &str,
        value_id: &str,
    ) -> Result<Value, StoreError> {
        let inner = self.inner.lock().unwrap();
        inner
            .values
            .get(shard_id)
            .and_then(|values| values.iter().find(|v| v.id == value_id))
            .cloned()
            .ok_or_else(|| StoreError::GetValue {
                shard: shard_id.to_string(),
                value: value_id.to_string(),
                reason: "no such value".to_string(),
            })
    }

    fn create_value(
        &self,
        _project_id: &str,
        shard_id: &str,
        value: &Value,
    ) -> Result<Value, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.values.contains_key(shard_id) {
            return Err(StoreError::CreateValue {
                shard: shard_id.to_string(),
                name: value.name.clone(),
                reason: "no such shard".to_string(),
            });
        }
        let exists = inner
            .values
            .get(shard_id)
            .is_some_and(|values| values.iter().any(|v| v.name == value.name));
        if exists {
            return Err(StoreError::CreateValue {
                shard: shard_id.to_string(),
                name: value.name.clone(),
                reason: "duplicate value name".to_string(),
            });
        }
        inner.next_value += 1;
        let created = Value {
            id: format!("value-{:04}", inner.next_value),
            name: value.name.clone(),
            value: value.value.clone(),
        };
        inner.calls.push(StoreCall::CreateValue {
            shard: shard_id.to_string(),
            name: value.name.clone(),
        });
        if let Some(values) = inner.values.get_mut(shard_id) {
            values.push(created.clone());
        }
        Ok(created)
    }

    fn delete_value(
        &self,
        _project_id: &str,
        shard_id: &str,
        value_id: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let values = inner
            .values
            .get_mut(shard_id)
            .ok_or_else(|| StoreError::DeleteValue {
                shard: shard_id.to_string(),
                value: value_id.to_string(),
                reason: "no such shard".to_string(),
            })?;
        let before = values.len();
        values.retain(|v| v.id != value_id);
        if values.len() == before {
            return Err(StoreError::DeleteValue {
                shard: shard_id.to_string(),
                value: value_id.to_string(),
                reason: "no such value".to_string(),
            });
        }
        inner.calls.push(StoreCall::DeleteValue {
            shard: shard_id.to_string(),
            value: value_id.to_string(),
        });
        Ok(())
    }

    fn delete_shard(&self, _project_id: &str, shard_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.shards.remove(shard_id).is_none() {
            return Err(StoreError::DeleteShard {
                shard: shard_id.to_string(),
                reason: "no such shard".to_string(),
            });
        }
        inner.values.remove(shard_id);
        inner.calls.push(StoreCall::DeleteShard {
            shard: shard_id.to_string(),
        });
        Ok(())
    }
}
