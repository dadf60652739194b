use std::{io, path::PathBuf};
use thiserror::Error;

use crate::services::store::StoreError;

/// Command-level failure. Every variant is fatal for the invocation: the
/// binary prints it as a single stderr line and exits non-zero without
/// writing a response.
///
/// Per-object transfer errors never become a `ResourceError` on their own;
/// they only surface through [`ResourceError::TotalFailure`] when nothing
/// succeeded.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("invalid source configuration: {0}")]
    Configuration(String),

    #[error("failed to decode request")]
    MalformedRequest(#[from] serde_json::Error),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("bucket `{0}` does not exist or is not accessible")]
    BucketNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("objects `{first}` and `{second}` would both be written to {}", .path.display())]
    DestinationCollision {
        first: String,
        second: String,
        path: PathBuf,
    },

    #[error("{0}")]
    TotalFailure(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type ResourceResult<T> = Result<T, ResourceError>;

impl ResourceError {
    /// Shortcut for a total-failure condition.
    pub fn total_failure(msg: impl Into<String>) -> Self {
        Self::TotalFailure(msg.into())
    }

    /// Process exit status by failure category.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) | Self::MalformedRequest(_) | Self::InvalidParams(_) => 2,
            Self::BucketNotFound(_) | Self::Store(_) => 3,
            Self::DestinationCollision { .. } | Self::TotalFailure(_) => 4,
            Self::Io(_) => 1,
        }
    }
}
