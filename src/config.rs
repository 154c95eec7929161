//! Run configuration.
//!
//! Built once from CLI arguments and passed by reference into each run;
//! there is no ambient/global configuration state.

use std::fmt;

/// Default admin API base URL.
pub const DEFAULT_BASE_URL: &str = "https://realm.mongodb.com/api/admin/v3.0/";

/// Credentials and identifiers shared by every tool run.
#[derive(Clone)]
pub struct Config {
    /// Public half of the admin API key pair.
    pub public_key: String,
    /// Private half of the admin API key pair.
    pub private_key: String,
    /// Organization owning the service instances.
    pub org_id: String,
    /// Project holding the broker-state shards.
    pub project_id: String,
    /// Admin API base URL, always with a trailing slash.
    pub base_url: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .field("org_id", &self.org_id)
            .field("project_id", &self.project_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}
