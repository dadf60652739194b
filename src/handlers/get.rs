//! `in`: fetch every object under the prefix into the destination directory.

use std::{path::Path, sync::Arc};
use tokio::fs;
use tracing::{info, warn};

use crate::{
    errors::{ResourceError, ResourceResult},
    models::{
        metadata::MetadataEntry,
        request::{InRequest, InResponse},
        version::{Version, display_timestamp},
    },
    services::{
        download::{BulkDownloader, DownloadSummary},
        store::{Connector, StoreGateway},
    },
};

use super::ensure_bucket;

/// Written into the destination alongside the fetched objects.
pub const VERSION_MARKER: &str = ".resource_version.json";

pub async fn fetch(
    request: InRequest,
    destination: &Path,
    connector: &dyn Connector,
) -> ResourceResult<InResponse> {
    request.source.validate()?;
    let gateway = connector.connect(&request.source).await;
    fetch_with(gateway, &request, destination).await
}

pub async fn fetch_with(
    gateway: Arc<dyn StoreGateway>,
    request: &InRequest,
    destination: &Path,
) -> ResourceResult<InResponse> {
    ensure_bucket(gateway.as_ref()).await?;
    fs::create_dir_all(destination).await?;

    let params = request.params();
    let prefix = request.source.normalized_prefix();
    let downloader =
        BulkDownloader::new(gateway, prefix, params.parallel).reserve(VERSION_MARKER);
    let summary = downloader.download_all(destination).await?;

    log_outcomes(&summary);
    write_version_marker(destination, &request.version).await;

    if summary.is_total_failure() {
        return Err(ResourceError::total_failure(format!(
            "all downloads failed ({} objects)",
            summary.failed()
        )));
    }

    info!(
        downloaded = summary.succeeded(),
        failed = summary.failed(),
        destination = %destination.display(),
        "fetch complete"
    );

    Ok(InResponse {
        version: request.version.clone(),
        metadata: fetch_metadata(&summary, &request.source.path_prefix, &request.version),
    })
}

fn log_outcomes(summary: &DownloadSummary) {
    for outcome in &summary.outcomes {
        let path = outcome
            .destination
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        match &outcome.result {
            Ok(bytes) => info!(key = %outcome.key, path = %path, bytes, "downloaded"),
            Err(err) => warn!(key = %outcome.key, error = %err, "download failed"),
        }
    }
}

async fn write_version_marker(destination: &Path, version: &Version) {
    let path = destination.join(VERSION_MARKER);
    let written = match serde_json::to_vec_pretty(version) {
        Ok(body) => fs::write(&path, body).await.map_err(|err| err.to_string()),
        Err(err) => Err(err.to_string()),
    };
    if let Err(err) = written {
        warn!(path = %path.display(), error = %err, "failed to write version file");
    }
}

fn fetch_metadata(
    summary: &DownloadSummary,
    path_prefix: &str,
    version: &Version,
) -> Vec<MetadataEntry> {
    let mut metadata = vec![
        MetadataEntry::new("files_downloaded", summary.succeeded()),
        MetadataEntry::new("files_failed", summary.failed()),
        MetadataEntry::new("path_prefix", path_prefix),
    ];
    if version.is_set() {
        metadata.push(MetadataEntry::new("version_path", &version.path));
        metadata.push(MetadataEntry::new("version_etag", &version.etag));
        metadata.push(MetadataEntry::new(
            "version_modified",
            display_timestamp(&version.last_modified),
        ));
    }
    metadata
}
