//! In-memory `StoreGateway` for tests.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use super::store::{Connector, StoreError, StoreGateway, StoreResult};
use crate::models::{object::ObjectRecord, source::SourceConfig};

#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub key: String,
    pub body: Bytes,
    pub size: u64,
    pub content_type: String,
}

/// A bucket held in memory, listed in insertion order.
pub struct MemoryStore {
    bucket: String,
    exists: bool,
    objects: Mutex<Vec<(ObjectRecord, Bytes)>>,
    failing_gets: HashSet<String>,
    failing_puts: HashSet<String>,
    get_delay: Duration,
    uploads: Mutex<Vec<StoredUpload>>,
    get_calls: AtomicUsize,
    connects: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryStore {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            exists: true,
            objects: Mutex::new(Vec::new()),
            failing_gets: HashSet::new(),
            failing_puts: HashSet::new(),
            get_delay: Duration::ZERO,
            uploads: Mutex::new(Vec::new()),
            get_calls: AtomicUsize::new(0),
            connects: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_object(
        self,
        key: &str,
        etag: &str,
        last_modified: DateTime<Utc>,
        body: &[u8],
    ) -> Self {
        let record = ObjectRecord::new(key, etag, last_modified, body.len() as u64);
        self.objects
            .lock()
            .unwrap()
            .push((record, Bytes::copy_from_slice(body)));
        self
    }

    /// GETs of `key` fail with a connectivity error.
    pub fn failing_get(mut self, key: &str) -> Self {
        self.failing_gets.insert(key.to_string());
        self
    }

    /// PUTs of `key` fail with a permission error.
    pub fn failing_put(mut self, key: &str) -> Self {
        self.failing_puts.insert(key.to_string());
        self
    }

    pub fn missing_bucket(mut self) -> Self {
        self.exists = false;
        self
    }

    /// Each GET sleeps this long while counted as in flight.
    pub fn with_get_delay(mut self, delay: Duration) -> Self {
        self.get_delay = delay;
        self
    }

    pub fn uploads(&self) -> Vec<StoredUpload> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Times this store was handed out through [`Connector`].
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreGateway for MemoryStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn bucket_exists(&self) -> StoreResult<bool> {
        Ok(self.exists)
    }

    async fn list_objects(&self, prefix: &str) -> StoreResult<Vec<ObjectRecord>> {
        if !self.exists {
            return Err(StoreError::BucketNotFound(self.bucket.clone()));
        }
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .map(|(record, _)| record)
            .filter(|record| record.key.starts_with(prefix) && !record.is_directory_marker())
            .cloned()
            .collect())
    }

    async fn get_object(&self, key: &str) -> StoreResult<ByteStream> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.get_delay.is_zero() {
            tokio::time::sleep(self.get_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_gets.contains(key) {
            return Err(StoreError::Connectivity(format!(
                "connection reset while fetching {}",
                key
            )));
        }
        let body = self
            .objects
            .lock()
            .unwrap()
            .iter()
            .find(|(record, _)| record.key == key)
            .map(|(_, body)| body.clone());
        match body {
            Some(body) => Ok(ByteStream::from(body)),
            None => Err(StoreError::ObjectNotFound {
                bucket: self.bucket.clone(),
                key: key.to_string(),
            }),
        }
    }

    async fn put_object(
        &self,
        key: &str,
        body: ByteStream,
        size: u64,
        content_type: &str,
    ) -> StoreResult<()> {
        if self.failing_puts.contains(key) {
            return Err(StoreError::PermissionDenied(format!("put {} denied", key)));
        }
        let body = body
            .collect()
            .await
            .map_err(|err| StoreError::Io(std::io::Error::other(err)))?
            .into_bytes();
        self.uploads.lock().unwrap().push(StoredUpload {
            key: key.to_string(),
            body,
            size,
            content_type: content_type.to_string(),
        });
        Ok(())
    }
}

/// Every connection resolves to the same shared store.
#[async_trait]
impl Connector for Arc<MemoryStore> {
    async fn connect(&self, _source: &SourceConfig) -> Arc<dyn StoreGateway> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.clone()
    }
}
