//! Bulk download for `in`: every object under the prefix, fetched with
//! bounded parallelism into a directory tree mirroring the key hierarchy.

use aws_sdk_s3::primitives::ByteStream;
use std::{
    collections::HashMap,
    io::{self, ErrorKind},
    path::{Component, Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    pool::run_bounded,
    store::{StoreError, StoreGateway},
};
use crate::{
    errors::{ResourceError, ResourceResult},
    models::object::ObjectRecord,
};

/// Why a single object was not written. Never aborts sibling transfers.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("refusing to write object `{0}` outside the destination")]
    UnsafeKey(String),
    #[error("object `{key}` maps to reserved file {}", .path.display())]
    Reserved { key: String, path: PathBuf },
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Fetch(#[from] StoreError),
    #[error("failed to write file {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("transfer task aborted: {0}")]
    Aborted(String),
}

/// Result of one object's transfer.
#[derive(Debug)]
pub struct DownloadOutcome {
    pub key: String,

    /// `None` when the key could not be mapped to a safe local path.
    pub destination: Option<PathBuf>,

    /// Bytes written on success.
    pub result: Result<u64, TransferError>,
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcomes in listing order.
#[derive(Debug, Default)]
pub struct DownloadSummary {
    pub outcomes: Vec<DownloadOutcome>,
}

impl DownloadSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Nothing succeeded and at least one object was attempted.
    pub fn is_total_failure(&self) -> bool {
        self.failed() > 0 && self.succeeded() == 0
    }
}

/// A listed object paired with where it will be written.
#[derive(Debug)]
struct Transfer {
    key: String,
    destination: Result<PathBuf, TransferError>,
}

pub struct BulkDownloader {
    gateway: Arc<dyn StoreGateway>,
    prefix: String,
    parallel: usize,
    reserved: Vec<PathBuf>,
}

impl BulkDownloader {
    /// `prefix` is the normalized listing prefix (trailing `/` included).
    pub fn new(gateway: Arc<dyn StoreGateway>, prefix: impl Into<String>, parallel: usize) -> Self {
        Self {
            gateway,
            prefix: prefix.into(),
            parallel: parallel.max(1),
            reserved: Vec::new(),
        }
    }

    /// Keep objects away from `relative` (a path under the destination root
    /// that the caller writes itself).
    pub fn reserve(mut self, relative: impl Into<PathBuf>) -> Self {
        self.reserved.push(relative.into());
        self
    }

    /// List everything under the prefix and fetch it into `root`.
    ///
    /// Per-object failures are recorded in the summary. Only listing
    /// failures and destination collisions fail the call, and both happen
    /// before any object is fetched.
    pub async fn download_all(&self, root: &Path) -> ResourceResult<DownloadSummary> {
        let objects = self.gateway.list_objects(&self.prefix).await?;
        let parallel = self.parallel.min(objects.len().max(1));
        info!(count = objects.len(), parallel, "fetching objects");

        let reserved: Vec<PathBuf> = self.reserved.iter().map(|r| root.join(r)).collect();
        let transfers = plan_transfers(&objects, &self.prefix, root, &reserved)?;
        let keys: Vec<(String, Option<PathBuf>)> = transfers
            .iter()
            .map(|t| (t.key.clone(), t.destination.as_ref().ok().cloned()))
            .collect();

        let gateway = Arc::clone(&self.gateway);
        let results = run_bounded(transfers, parallel, move |_, transfer| {
            let gateway = Arc::clone(&gateway);
            async move {
                let destination = transfer.destination?;
                fetch_to_file(gateway.as_ref(), &transfer.key, &destination).await
            }
        })
        .await;

        let outcomes = keys
            .into_iter()
            .zip(results)
            .map(|((key, destination), joined)| DownloadOutcome {
                key,
                destination,
                result: joined.unwrap_or_else(|err| Err(TransferError::Aborted(err.to_string()))),
            })
            .collect();

        Ok(DownloadSummary { outcomes })
    }
}

/// Map every listed object to its destination, failing the whole run if two
/// objects would land on the same path. Objects mapping onto a `reserved`
/// path fail individually.
fn plan_transfers(
    objects: &[ObjectRecord],
    prefix: &str,
    root: &Path,
    reserved: &[PathBuf],
) -> ResourceResult<Vec<Transfer>> {
    let mut claimed: HashMap<PathBuf, &str> = HashMap::with_capacity(objects.len());
    let mut transfers = Vec::with_capacity(objects.len());

    for object in objects {
        let destination = relative_destination(&object.key, prefix)
            .map(|rel| root.join(rel))
            .and_then(|path| {
                if reserved.contains(&path) {
                    Err(TransferError::Reserved {
                        key: object.key.clone(),
                        path,
                    })
                } else {
                    Ok(path)
                }
            });
        if let Ok(path) = &destination {
            if let Some(first) = claimed.insert(path.clone(), &object.key) {
                return Err(ResourceError::DestinationCollision {
                    first: first.to_string(),
                    second: object.key.clone(),
                    path: path.clone(),
                });
            }
        }
        transfers.push(Transfer {
            key: object.key.clone(),
            destination,
        });
    }

    Ok(transfers)
}

/// Local path for `key`, relative to the destination root.
///
/// The prefix is stripped; a key equal to the prefix falls back to its last
/// segment. Empty and `.` segments are dropped, so keys with doubled or
/// leading slashes stay inside the root. `..` segments are rejected.
pub fn relative_destination(key: &str, prefix: &str) -> Result<PathBuf, TransferError> {
    let remainder = key.strip_prefix(prefix).unwrap_or(key);
    let relative = if remainder.is_empty() {
        base_name(key)
    } else {
        remainder
    };

    let mut path = PathBuf::new();
    for segment in relative.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(TransferError::UnsafeKey(key.to_string())),
            _ => path.push(segment),
        }
    }

    // A segment like "C:" or one containing a separator would escape `root`.
    let only_plain = path
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    if path.as_os_str().is_empty() || !only_plain {
        return Err(TransferError::UnsafeKey(key.to_string()));
    }
    Ok(path)
}

fn base_name(key: &str) -> &str {
    key.trim_end_matches('/').rsplit('/').next().unwrap_or(key)
}

/// Stream one object into `destination`.
///
/// Writes to a temporary sibling first and renames it into place, so a
/// failed transfer never leaves a truncated file at the destination path.
async fn fetch_to_file(
    gateway: &dyn StoreGateway,
    key: &str,
    destination: &Path,
) -> Result<u64, TransferError> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|source| TransferError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    let body = gateway.get_object(key).await?;

    let tmp_path = temp_path_for(destination);
    let written = match write_body(body, &tmp_path).await {
        Ok(written) => written,
        Err(source) => {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(TransferError::Write {
                path: destination.to_path_buf(),
                source,
            });
        }
    };

    if let Err(source) = replace_file(&tmp_path, destination).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(TransferError::Write {
            path: destination.to_path_buf(),
            source,
        });
    }

    debug!(key, path = %destination.display(), bytes = written, "object written");
    Ok(written)
}

async fn write_body(body: ByteStream, path: &Path) -> io::Result<u64> {
    let mut file = File::create(path).await?;
    let reader = body.into_async_read();
    tokio::pin!(reader);
    let written = tokio::io::copy(&mut reader, &mut file).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

async fn replace_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            fs::remove_file(to).await?;
            fs::rename(from, to).await
        }
        Err(err) => Err(err),
    }
}

fn temp_path_for(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(".{}.tmp-{}", name, Uuid::new_v4()))
}
