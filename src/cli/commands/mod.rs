pub(crate) mod convert;
pub(crate) mod merge;
pub(crate) mod repair;

use crate::store::{HttpStateStore, StoreError};

pub(crate) fn connect(
    base_url: &str,
    public_key: &str,
    private_key: &str,
) -> Result<HttpStateStore, StoreError> {
    tracing::info!("authorizing to the admin API");
    HttpStateStore::connect(base_url, public_key, private_key)
}
