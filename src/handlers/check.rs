//! `check`: report versions newer than the one the driver last saw.

use tracing::{debug, info};

use crate::{
    errors::ResourceResult,
    models::{
        request::{CheckRequest, CheckResponse},
        version::rfc3339,
    },
    services::{
        store::{Connector, StoreGateway},
        versions::detect_new_versions,
    },
};

use super::ensure_bucket;

pub async fn check(
    request: CheckRequest,
    connector: &dyn Connector,
) -> ResourceResult<CheckResponse> {
    request.source.validate()?;
    let gateway = connector.connect(&request.source).await;
    check_with(gateway.as_ref(), &request).await
}

pub async fn check_with(
    gateway: &dyn StoreGateway,
    request: &CheckRequest,
) -> ResourceResult<CheckResponse> {
    ensure_bucket(gateway).await?;

    let prefix = request.source.normalized_prefix();
    let listing = gateway.list_objects(&prefix).await?;
    let versions = detect_new_versions(&listing, request.prior_version());

    info!(
        listed = listing.len(),
        reported = versions.len(),
        prefix = %prefix,
        "check complete"
    );
    if let Some(latest) = versions.last() {
        debug!(
            path = %latest.path,
            etag = %latest.etag,
            last_modified = %rfc3339(&latest.last_modified),
            "latest version"
        );
    }
    Ok(versions)
}
