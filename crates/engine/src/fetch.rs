use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;

use profilesync_core::{PlayerSnapshot, PlayerTag, RankingsSnapshot};

use crate::error::SyncError;

/// Failures reported by the network layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("bad tag: {0}")]
    BadTag(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("server error {code}: {message}")]
    Server { code: u16, message: String },

    #[error("network unreachable: {0}")]
    Network(String),

    #[error("decode error: {0}")]
    Decode(String),
}

/// The remote stats service. Transport and wire format live behind this.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    async fn fetch(&self, tag: &PlayerTag) -> Result<PlayerSnapshot, FetchError>;

    async fn fetch_rankings(&self, tag: &PlayerTag) -> Result<RankingsSnapshot, FetchError>;
}

/// Wait for a spawned fetch for at most `limit`.
///
/// On timeout the task is aborted and awaited before returning, so the
/// request never outlives the call. When the task finishes first the timer is
/// dropped with the `timeout` future. A task aborted from elsewhere reports
/// [`SyncError::Cancelled`].
pub async fn join_with_timeout<T>(
    mut handle: JoinHandle<Result<T, FetchError>>,
    limit: Duration,
) -> Result<T, SyncError> {
    match tokio::time::timeout(limit, &mut handle).await {
        Ok(Ok(result)) => result.map_err(SyncError::from),
        Ok(Err(join_err)) if join_err.is_cancelled() => Err(SyncError::Cancelled),
        Ok(Err(join_err)) => Err(SyncError::Network(format!("fetch task failed: {join_err}"))),
        Err(_) => {
            handle.abort();
            let _ = handle.await;
            Err(SyncError::Timeout(limit))
        }
    }
}
