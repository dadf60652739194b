//! Glob-driven upload for `out`.

use aws_sdk_s3::primitives::ByteStream;
use chrono::{DateTime, Utc};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::fs;
use tracing::{info, warn};

use super::store::StoreGateway;
use crate::{
    errors::{ResourceError, ResourceResult},
    models::version::Version,
};

const CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug)]
pub struct UploadSummary {
    /// Keys written, in glob order.
    pub uploaded: Vec<String>,

    /// Points at the last uploaded key.
    pub version: Version,
}

pub struct Uploader {
    gateway: Arc<dyn StoreGateway>,
    prefix: String,
}

impl Uploader {
    /// `prefix` is the raw configured prefix; surrounding slashes are ignored.
    pub fn new(gateway: Arc<dyn StoreGateway>, prefix: impl Into<String>) -> Self {
        Self {
            gateway,
            prefix: prefix.into(),
        }
    }

    /// Upload every file under `source_dir` matching `pattern`.
    ///
    /// Individual files that cannot be read or stored are skipped with a
    /// warning. The call fails only when the pattern is invalid, matches
    /// nothing, or nothing could be uploaded.
    pub async fn upload_matching(
        &self,
        source_dir: &Path,
        pattern: &str,
    ) -> ResourceResult<UploadSummary> {
        let matches = expand_pattern(source_dir, pattern)?;
        if matches.is_empty() {
            return Err(ResourceError::total_failure(format!(
                "no files found matching pattern: {}",
                pattern
            )));
        }
        info!(count = matches.len(), pattern, "uploading matched files");

        let mut uploaded = Vec::new();
        for path in matches {
            let metadata = match fs::metadata(&path).await {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "cannot stat file, skipping");
                    continue;
                }
            };
            if metadata.is_dir() {
                continue;
            }

            let key = object_key(&self.prefix, source_dir, &path);
            let body = match ByteStream::from_path(&path).await {
                Ok(body) => body,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "cannot open file, skipping");
                    continue;
                }
            };

            match self
                .gateway
                .put_object(&key, body, metadata.len(), CONTENT_TYPE)
                .await
            {
                Ok(()) => {
                    info!(key = %key, bytes = metadata.len(), "uploaded");
                    uploaded.push(key);
                }
                Err(err) => warn!(key = %key, error = %err, "upload failed, skipping"),
            }
        }

        let Some(last) = uploaded.last() else {
            return Err(ResourceError::total_failure(
                "no files were uploaded successfully",
            ));
        };
        let version = upload_version(last, Utc::now());
        Ok(UploadSummary { uploaded, version })
    }
}

/// Version for a completed upload. The ETag is derived from the upload time,
/// not from the content.
fn upload_version(key: &str, now: DateTime<Utc>) -> Version {
    let now = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);
    Version {
        path: key.to_string(),
        etag: format!("upload-{}", now.timestamp()),
        last_modified: now,
    }
}

/// Paths under `source_dir` matching `pattern`, in glob order.
fn expand_pattern(source_dir: &Path, pattern: &str) -> ResourceResult<Vec<PathBuf>> {
    let base = glob::Pattern::escape(&source_dir.to_string_lossy());
    let full = format!("{}/{}", base.trim_end_matches('/'), pattern);
    let paths = glob::glob(&full)
        .map_err(|err| ResourceError::InvalidParams(format!("bad file pattern `{}`: {}", pattern, err)))?;

    let mut matches = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => matches.push(path),
            Err(err) => warn!(error = %err, "unreadable path while matching, skipping"),
        }
    }
    Ok(matches)
}

/// Store key for `path`: the prefix joined with the path relative to
/// `source_dir`, using `/` separators and no empty segments.
pub fn object_key(prefix: &str, source_dir: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(source_dir).unwrap_or(path);
    let relative: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    prefix
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .chain(relative)
        .collect::<Vec<_>>()
        .join("/")
}
