//! `out`: optionally push files from the source directory to the store.

use chrono::{DateTime, Utc};
use std::{path::Path, sync::Arc};
use tracing::info;

use crate::{
    errors::ResourceResult,
    models::{
        metadata::MetadataEntry,
        params::PutParams,
        request::{OutRequest, OutResponse},
        version::Version,
    },
    services::{
        store::{Connector, StoreGateway},
        upload::Uploader,
    },
};

use super::ensure_bucket;

pub async fn publish(
    request: OutRequest,
    source_dir: &Path,
    connector: &dyn Connector,
) -> ResourceResult<OutResponse> {
    request.source.validate()?;

    let params = request.params();
    if !params.upload_enabled {
        info!("uploads disabled, reporting placeholder version");
        return Ok(disabled_response(Utc::now()));
    }

    let gateway = connector.connect(&request.source).await;
    publish_with(gateway, &request, &params, source_dir).await
}

pub async fn publish_with(
    gateway: Arc<dyn StoreGateway>,
    request: &OutRequest,
    params: &PutParams,
    source_dir: &Path,
) -> ResourceResult<OutResponse> {
    ensure_bucket(gateway.as_ref()).await?;

    let uploader = Uploader::new(gateway, request.source.path_prefix.clone());
    let summary = uploader.upload_matching(source_dir, &params.file).await?;

    info!(
        uploaded = summary.uploaded.len(),
        version = %summary.version.path,
        "publish complete"
    );

    Ok(OutResponse {
        version: summary.version,
        metadata: vec![
            MetadataEntry::new("files_uploaded", summary.uploaded.len()),
            MetadataEntry::new("upload_pattern", &params.file),
        ],
    })
}

fn disabled_response(now: DateTime<Utc>) -> OutResponse {
    let now = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);
    OutResponse {
        version: Version {
            path: "no-upload".to_string(),
            etag: "disabled".to_string(),
            last_modified: now,
        },
        metadata: vec![MetadataEntry::new("upload_status", "disabled")],
    }
}
