//! JSON documents read from stdin and written to stdout by each command.

use serde::{Deserialize, Serialize};

use super::{
    metadata::MetadataEntry,
    params::{GetParams, PutParams, RawParams},
    source::SourceConfig,
    version::Version,
};

/// Input of `check`.
#[derive(Deserialize, Debug, Clone)]
pub struct CheckRequest {
    pub source: SourceConfig,

    /// Last version the driver saw; `null`, absent or empty-path means none.
    #[serde(default)]
    pub version: Option<Version>,
}

impl CheckRequest {
    pub fn prior_version(&self) -> Option<&Version> {
        self.version.as_ref().filter(|v| v.is_set())
    }
}

/// Output of `check`: versions ordered oldest first.
pub type CheckResponse = Vec<Version>;

/// Input of `in`.
#[derive(Deserialize, Debug, Clone)]
pub struct InRequest {
    pub source: SourceConfig,

    /// Requested version; echoed back, not used to filter the download.
    #[serde(default)]
    pub version: Version,

    #[serde(default)]
    pub params: Option<RawParams>,
}

impl InRequest {
    pub fn params(&self) -> GetParams {
        GetParams::from_raw(self.params.as_ref())
    }
}

/// Input of `out`.
#[derive(Deserialize, Debug, Clone)]
pub struct OutRequest {
    pub source: SourceConfig,

    #[serde(default)]
    pub params: Option<RawParams>,
}

impl OutRequest {
    pub fn params(&self) -> PutParams {
        PutParams::from_raw(self.params.as_ref())
    }
}

/// Output of both `in` and `out`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VersionResponse {
    pub version: Version,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<MetadataEntry>,
}

impl VersionResponse {
    /// First metadata value recorded under `name`.
    pub fn metadata_value(&self, name: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.value.as_str())
    }
}

pub type InResponse = VersionResponse;
pub type OutResponse = VersionResponse;
