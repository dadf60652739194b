//! One handler per resource command. Each takes the decoded request,
//! talks to the store through a [`StoreGateway`] and returns the response
//! document for stdout.

pub mod check;
pub mod get;
pub mod put;

use tracing::debug;

use crate::{
    errors::{ResourceError, ResourceResult},
    services::store::StoreGateway,
};

/// Fail with `BucketNotFound` unless the gateway's bucket is reachable.
pub(crate) async fn ensure_bucket(gateway: &dyn StoreGateway) -> ResourceResult<()> {
    if gateway.bucket_exists().await? {
        debug!(bucket = gateway.bucket(), "bucket exists");
        Ok(())
    } else {
        Err(ResourceError::BucketNotFound(gateway.bucket().to_string()))
    }
}
