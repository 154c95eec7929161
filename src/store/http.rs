//! Thin blocking HTTP client for the admin API.
//!
//! Transport glue only: the key pair is exchanged for a bearer token once
//! at connect time, after that every call is a plain JSON round-trip. All
//! policy (ordering, retries, dry-run) lives in the run modules.

use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Shard, StateStore, StoreError, Value, ValueSummary};

pub struct HttpStateStore {
    http: Client,
    base_url: String,
    token: String,
}

#[derive(serde::Deserialize)]
struct LoginResponse {
    access_token: String,
}

impl HttpStateStore {
    /// Build a client and perform the startup auth handshake.
    pub fn connect(
        base_url: &str,
        public_key: &str,
        private_key: &str,
    ) -> Result<Self, StoreError> {
        let http = Client::builder().build().map_err(|e| StoreError::Auth {
            reason: e.to_string(),
        })?;

        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };

        let resp = http
            .post(format!("{base_url}auth/providers/mongodb-cloud/login"))
            .json(&serde_json::json!({
                "username": public_key,
                "apiKey": private_key,
            }))
            .send()
            .map_err(|e| StoreError::Auth {
                reason: e.to_string(),
            })?;

        let resp = check(resp).map_err(|reason| StoreError::Auth { reason })?;
        let login: LoginResponse = resp.json().map_err(|e| StoreError::Auth {
            reason: e.to_string(),
        })?;

        Ok(HttpStateStore {
            http,
            base_url,
            token: login.access_token,
        })
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, String> {
        let resp = self
            .http
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .map_err(|e| e.to_string())?;
        check(resp)?.json().map_err(|e| e.to_string())
    }

    fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, String> {
        let resp = self
            .http
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .map_err(|e| e.to_string())?;
        check(resp)?.json().map_err(|e| e.to_string())
    }

    fn delete(&self, path: &str) -> Result<(), String> {
        let resp = self
            .http
            .delete(format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .map_err(|e| e.to_string())?;
        check(resp).map(|_| ())
    }
}

fn check(resp: Response) -> Result<Response, String> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    Err(format!("status {status}: {body}"))
}

impl StateStore for HttpStateStore {
    fn list_shards(&self, project_id: &str) -> Result<Vec<Shard>, StoreError> {
        self.get_json(&format!("groups/{project_id}/apps"))
            .map_err(|reason| StoreError::ListShards {
                project: project_id.to_string(),
                reason,
            })
    }

    fn list_values(
        &self,
        project_id: &str,
        shard_id: &str,
    ) -> Result<Vec<ValueSummary>, StoreError> {
        self.get_json(&format!("groups/{project_id}/apps/{shard_id}/values"))
            .map_err(|reason| StoreError::ListValues {
                shard: shard_id.to_string(),
                reason,
            })
    }

    fn get_value(
        &self,
        project_id: &str,
        shard_id: &str,
        value_id: &str,
    ) -> Result<Value, StoreError> {
        self.get_json(&format!(
            "groups/{project_id}/apps/{shard_id}/values/{value_id}"
        ))
        .map_err(|reason| StoreError::GetValue {
            shard: shard_id.to_string(),
            value: value_id.to_string(),
            reason,
        })
    }

    fn create_value(
        &self,
        project_id: &str,
        shard_id: &str,
        value: &Value,
    ) -> Result<Value, StoreError> {
        self.post_json(&format!("groups/{project_id}/apps/{shard_id}/values"), value)
            .map_err(|reason| StoreError::CreateValue {
                shard: shard_id.to_string(),
                name: value.name.clone(),
                reason,
            })
    }

    fn delete_value(
        &self,
        project_id: &str,
        shard_id: &str,
        value_id: &str,
    ) -> Result<(), StoreError> {
        self.delete(&format!(
            "groups/{project_id}/apps/{shard_id}/values/{value_id}"
        ))
        .map_err(|reason| StoreError::DeleteValue {
            shard: shard_id.to_string(),
            value: value_id.to_string(),
            reason,
        })
    }

    fn delete_shard(&self, project_id: &str, shard_id: &str) -> Result<(), StoreError> {
        self.delete(&format!("groups/{project_id}/apps/{shard_id}"))
            .map_err(|reason| StoreError::DeleteShard {
                shard: shard_id.to_string(),
                reason,
            })
    }
}
