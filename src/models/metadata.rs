//! Name/value pairs attached to `in` and `out` responses.

use serde::{Deserialize, Serialize};

/// A single metadata entry shown by the driver next to a fetched or pushed
/// version.
///
/// Entries keep insertion order and duplicates are not merged.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MetadataEntry {
    /// Display name (e.g. "files_downloaded").
    pub name: String,

    /// Display value, always a string on the wire.
    pub value: String,
}

impl MetadataEntry {
    pub fn new(name: impl Into<String>, value: impl ToString) -> Self {
        Self {
            name: name.into(),
            value: value.to_string(),
        }
    }
}
