//! Stored instance records and parameter-shape classification.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The decoded payload of a state value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceDetailsSpec {
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub plan_id: String,
    #[serde(default)]
    pub dashboard_url: String,
    /// Polymorphic on the wire; classify with [`Params::classify`].
    #[serde(default)]
    pub parameters: Value,
}

impl InstanceDetailsSpec {
    pub fn params(&self) -> Params {
        Params::classify(&self.parameters)
    }
}

/// The shape of a stored `parameters` field.
///
/// Classification is total and re-derived at every inspection; it is never
/// cached across remote calls.
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    /// Already in the canonical encoded form; no action required.
    Canonical(String),
    /// Legacy unordered map, pending conversion.
    Legacy(Map<String, Value>),
    /// Neither a string nor a map; reported and left untouched.
    Unrecognized(Value),
}

impl Params {
    pub fn classify(raw: &Value) -> Params {
        match raw {
            Value::String(s) => Params::Canonical(s.clone()),
            Value::Object(map) => Params::Legacy(map.clone()),
            other => Params::Unrecognized(other.clone()),
        }
    }
}
