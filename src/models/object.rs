//! Represents an object (file) listed from the store.

use chrono::{DateTime, Timelike, Utc};

use super::version::Version;

/// A single object as reported by a bucket listing.
///
/// Records are produced fresh by every listing call and are never cached
/// across invocations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectRecord {
    /// Object key (path-like identifier within the bucket).
    pub key: String,

    /// Store-supplied ETag with surrounding quotes stripped.
    pub etag: String,

    /// Timestamp when the object was last modified, in whole seconds to
    /// match the precision of the version wire format.
    pub last_modified: DateTime<Utc>,

    /// Size in bytes.
    pub size: u64,
}

impl ObjectRecord {
    pub fn new(
        key: impl Into<String>,
        etag: impl Into<String>,
        last_modified: DateTime<Utc>,
        size: u64,
    ) -> Self {
        Self {
            key: key.into(),
            etag: etag.into(),
            last_modified: last_modified.with_nanosecond(0).unwrap_or(last_modified),
            size,
        }
    }

    /// Zero-size keys ending in `/` are folder placeholders, not content.
    pub fn is_directory_marker(&self) -> bool {
        self.size == 0 && self.key.ends_with('/')
    }

    /// The version triple the driver tracks for this object.
    pub fn to_version(&self) -> Version {
        Version {
            path: self.key.clone(),
            etag: self.etag.clone(),
            last_modified: self.last_modified,
        }
    }
}
