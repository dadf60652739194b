//! The version triple exchanged with the driver.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One object's `(path, etag, last_modified)` triple.
///
/// The driver round-trips the last version it was given, so this is the only
/// "state" the resource has between invocations. A version with an empty
/// `path` is treated as unset.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Version {
    /// Object key.
    #[serde(default)]
    pub path: String,

    /// Store-supplied fingerprint (opaque, not a content hash).
    #[serde(default)]
    pub etag: String,

    /// Last-modified timestamp, RFC3339 on the wire.
    #[serde(default = "unix_epoch", with = "timestamp")]
    pub last_modified: DateTime<Utc>,
}

impl Version {
    pub fn is_set(&self) -> bool {
        !self.path.is_empty()
    }

    /// Same object as `other`: equal path and fingerprint.
    pub fn same_object(&self, other: &Version) -> bool {
        self.path == other.path && self.etag == other.etag
    }

    /// Oldest first, ties broken by path.
    pub fn chronological(a: &Version, b: &Version) -> Ordering {
        a.last_modified
            .cmp(&b.last_modified)
            .then_with(|| a.path.cmp(&b.path))
    }
}

fn unix_epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

/// Serde adapter for `last_modified`.
///
/// Encodes RFC3339 with second precision. Decodes RFC3339, a Unix-epoch
/// integer carried in a string, or a bare JSON integer. Empty or null
/// decodes to the Unix epoch.
pub mod timestamp {
    use super::unix_epoch;
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Seconds(i64),
        Text(String),
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<RawTimestamp>::deserialize(deserializer)? {
            None => Ok(unix_epoch()),
            Some(RawTimestamp::Seconds(secs)) => from_unix(secs).map_err(D::Error::custom),
            Some(RawTimestamp::Text(text)) => parse(&text).map_err(D::Error::custom),
        }
    }

    pub fn parse(text: &str) -> Result<DateTime<Utc>, String> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(unix_epoch());
        }
        if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
            return Ok(parsed.with_timezone(&Utc));
        }
        match text.parse::<i64>() {
            Ok(secs) => from_unix(secs),
            Err(_) => Err(format!(
                "invalid last_modified `{}`: expected RFC3339 or Unix seconds",
                text
            )),
        }
    }

    fn from_unix(secs: i64) -> Result<DateTime<Utc>, String> {
        DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| format!("last_modified {} is out of range", secs))
    }
}

/// Display form used in `in` metadata (`2024-01-02 15:04:05`).
pub fn display_timestamp(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// RFC3339 form used in log lines.
pub fn rfc3339(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}
