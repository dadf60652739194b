//! The store seam: the handful of object-store operations the resource
//! needs, behind a trait so commands can run against S3 or, in tests, an
//! in-memory bucket.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use std::{io, sync::Arc};
use thiserror::Error;

use crate::models::{object::ObjectRecord, source::SourceConfig};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("bucket `{0}` not found")]
    BucketNotFound(String),
    #[error("object `{key}` not found in bucket `{bucket}`")]
    ObjectNotFound { bucket: String, key: String },
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("store unreachable: {0}")]
    Connectivity(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Authenticated access to one bucket.
///
/// Implementations hold credentials and TLS settings for the lifetime of the
/// process and perform no I/O beyond the requested call.
#[async_trait]
pub trait StoreGateway: Send + Sync {
    /// Bucket every call operates on.
    fn bucket(&self) -> &str;

    /// `Ok(false)` when the store says the bucket does not exist; network
    /// and auth failures are errors.
    async fn bucket_exists(&self) -> StoreResult<bool>;

    /// Every object whose key starts with `prefix`, recursively, minus
    /// directory markers. Order is whatever the store returns.
    async fn list_objects(&self, prefix: &str) -> StoreResult<Vec<ObjectRecord>>;

    async fn get_object(&self, key: &str) -> StoreResult<ByteStream>;

    async fn put_object(
        &self,
        key: &str,
        body: ByteStream,
        size: u64,
        content_type: &str,
    ) -> StoreResult<()>;
}

/// Opens a gateway for a validated `source:` block.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, source: &SourceConfig) -> Arc<dyn StoreGateway>;
}
