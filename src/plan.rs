//! Plan schema and the canonical transport codec.
//!
//! The canonical on-wire form of a [`Plan`] is standard Base64 over its
//! JSON serialization. The legacy form is a free-form JSON map that either
//! is a plan or nests one under a `plan` key.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("cannot encode plan: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("legacy parameters do not match the plan schema: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("canonical parameters are not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Project identity a plan provisions into.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "orgId")]
    pub org_id: String,
}

/// Structured configuration for a provisioned cluster instance.
///
/// Cluster, user and access-list documents are kept free-form: the codec
/// guarantees structural round-tripping, not semantic validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<Project>,

    /// Embedded API credentials. Stripped before any rebuilt plan is
    /// persisted forward.
    #[serde(default, rename = "apiKey", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<Value>,

    #[serde(default, rename = "databaseUsers", skip_serializing_if = "Option::is_none")]
    pub database_users: Option<Value>,

    #[serde(default, rename = "ipAccessLists", skip_serializing_if = "Option::is_none")]
    pub ip_access_lists: Option<Value>,
}

/// Serialize a plan to its canonical transport encoding.
pub fn encode_plan(plan: &Plan) -> Result<String, CodecError> {
    let json = serde_json::to_vec(plan).map_err(CodecError::Encode)?;
    Ok(STANDARD.encode(json))
}

/// Decode a canonical transport encoding back into a plan.
pub fn decode_canonical(encoded: &str) -> Result<Plan, CodecError> {
    let raw = STANDARD.decode(encoded.trim())?;
    serde_json::from_slice(&raw).map_err(CodecError::Decode)
}

/// Decode a legacy parameter map into a plan.
///
/// If the map carries a `plan` key only that sub-document is used; sibling
/// keys are ignored. Otherwise the whole map is decoded.
pub fn decode_legacy(params: &Map<String, Value>) -> Result<Plan, CodecError> {
    let selected = match params.get("plan") {
        Some(nested) => nested.clone(),
        None => Value::Object(params.clone()),
    };
    serde_json::from_value(selected).map_err(CodecError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_plan() -> Plan {
        Plan {
            name: Some("dedicated-m10".to_string()),
            description: Some("Dedicated M10 cluster".to_string()),
            free: Some(false),
            project: Some(Project {
                id: "proj-1".to_string(),
                org_id: "org-1".to_string(),
            }),
            api_key: None,
            cluster: Some(json!({
                "name": "cluster-one",
                "providerSettings": { "instanceSizeName": "M10" },
            })),
            database_users: None,
            ip_access_lists: None,
        }
    }

    #[test]
    fn canonical_round_trip_is_lossless() {
        let plan = sample_plan();
        let encoded = encode_plan(&plan).expect("encode");
        let decoded = decode_canonical(&encoded).expect("decode");
        assert_eq!(decoded, plan);
    }

    #[test]
    fn legacy_map_with_plan_key_uses_only_that_sub_map() {
        let params = json!({
            "plan": {
                "name": "nested",
                "project": { "id": "p", "orgId": "o" },
            },
            "unrelated_sibling": { "name": "ignored" },
        });
        let Value::Object(map) = params else {
            unreachable!()
        };
        let plan = decode_legacy(&map).expect("decode");
        assert_eq!(plan.name.as_deref(), Some("nested"));
        assert_eq!(plan.project.expect("project").id, "p");
    }

    #[test]
    fn legacy_map_without_plan_key_is_used_wholesale() {
        let params = json!({
            "name": "flat",
            "free": true,
        });
        let Value::Object(map) = params else {
            unreachable!()
        };
        let plan = decode_legacy(&map).expect("decode");
        assert_eq!(plan.name.as_deref(), Some("flat"));
        assert_eq!(plan.free, Some(true));
    }

    #[test]
    fn legacy_type_mismatch_is_a_decode_error() {
        let params = json!({ "name": 42 });
        let Value::Object(map) = params else {
            unreachable!()
        };
        let err = decode_legacy(&map).expect_err("must fail");
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let err = decode_canonical("not/base64!!").expect_err("must fail");
        assert!(matches!(err, CodecError::Base64(_)));
    }
}
