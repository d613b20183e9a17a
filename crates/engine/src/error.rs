use std::time::Duration;

use profilesync_storage::StorageError;
use thiserror::Error;

use crate::fetch::FetchError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("request cancelled")]
    Cancelled,

    #[error("network error: {0}")]
    Network(String),

    #[error("player not found: {0}")]
    NotFound(String),

    #[error("server error {code}: {message}")]
    Server { code: u16, message: String },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("a refresh is already in progress")]
    RefreshInProgress,

    #[error("invalid tag: {0}")]
    InvalidTag(String),

    #[error("no profile loaded")]
    NoData,

    #[error("profile changed while the request was in flight")]
    Superseded,
}

impl SyncError {
    /// Short text suitable for a toast or alert.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "The request timed out. Please try again.",
            Self::Cancelled => "The request was cancelled.",
            Self::RefreshInProgress => "A refresh is already running.",
            Self::InvalidTag(_) => "That player tag is not valid.",
            Self::NotFound(_) => "No player with that tag was found.",
            Self::NoData => "There is no profile to refresh.",
            _ => "Something went wrong. Please try again later.",
        }
    }

    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Cancelled | Self::Network(_) | Self::Server { .. }
        )
    }
}

impl From<FetchError> for SyncError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::BadTag(tag) => Self::InvalidTag(tag),
            FetchError::NotFound(tag) => Self::NotFound(tag),
            FetchError::Server { code, message } => Self::Server { code, message },
            FetchError::Network(msg) => Self::Network(msg),
            FetchError::Decode(msg) => Self::Decode(msg),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("invalid config value: {0}")]
    Value(#[from] profilesync_core::CoreError),

    #[error("failed to open store: {0}")]
    Storage(#[from] StorageError),
}
