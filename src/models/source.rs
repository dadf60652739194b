//! Connection settings supplied by the pipeline's `source:` block.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::ResourceError;

const DEFAULT_REGION: &str = "us-east-1";

/// Where the resource's objects live and how to reach them.
///
/// Required string fields default to empty so that a missing field is
/// reported by [`SourceConfig::validate`] rather than as malformed JSON.
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct SourceConfig {
    /// `host[:port]` of the store, or a full `http(s)://` URL.
    #[serde(default)]
    pub endpoint: String,

    #[serde(default)]
    pub access_key: String,

    #[serde(default)]
    pub secret_key: String,

    #[serde(default)]
    pub bucket: String,

    /// Key prefix selecting the objects this resource manages.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path_prefix: String,

    /// Defaults to `true` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_ssl: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Accept any server certificate (only meaningful with TLS on).
    #[serde(default)]
    pub skip_ssl_verification: bool,
}

impl SourceConfig {
    /// Reject configurations missing a required field.
    ///
    /// Runs before any network call; fields are checked in a fixed order so
    /// the error always names the first gap.
    pub fn validate(&self) -> Result<(), ResourceError> {
        let required = [
            ("endpoint", &self.endpoint),
            ("access_key", &self.access_key),
            ("secret_key", &self.secret_key),
            ("bucket", &self.bucket),
        ];
        for (field, value) in required {
            if value.is_empty() {
                return Err(ResourceError::Configuration(format!("{} is required", field)));
            }
        }
        Ok(())
    }

    pub fn use_ssl(&self) -> bool {
        self.use_ssl.unwrap_or(true)
    }

    pub fn region(&self) -> &str {
        self.region
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REGION)
    }

    /// Listing prefix: the configured prefix with a trailing `/` ensured.
    pub fn normalized_prefix(&self) -> String {
        let prefix = &self.path_prefix;
        if prefix.is_empty() || prefix.ends_with('/') {
            prefix.clone()
        } else {
            format!("{}/", prefix)
        }
    }

    /// Endpoint as a URL, picking the scheme from `use_ssl` when the
    /// configured endpoint has none.
    pub fn endpoint_url(&self) -> String {
        let endpoint = self.endpoint.trim().trim_end_matches('/');
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else if self.use_ssl() {
            format!("https://{}", endpoint)
        } else {
            format!("http://{}", endpoint)
        }
    }
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("path_prefix", &self.path_prefix)
            .field("use_ssl", &self.use_ssl())
            .field("region", &self.region())
            .field("skip_ssl_verification", &self.skip_ssl_verification)
            .finish()
    }
}
