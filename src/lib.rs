#![forbid(unsafe_code)]

pub mod archive;
pub mod backup;
pub mod cli;
pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod plan;
pub mod reconcile;
pub mod repair;
pub mod store;
pub mod telemetry;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

// Re-export the central data types at crate root for convenience
pub use crate::archive::InstanceData;
pub use crate::model::{InstanceDetailsSpec, Params};
pub use crate::plan::{Plan, Project};
pub use crate::store::{Shard, StateStore, Value, ValueSummary};
