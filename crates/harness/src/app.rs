use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use profilesync_core::ManualClock;
use profilesync_engine::{ConfigError, MemoryFlags, ProfileSync, SyncConfig};
use profilesync_storage::SqliteStore;

use crate::FakeFetcher;

/// Wall-clock start for every test app: 2024-01-01 12:00 UTC.
pub fn test_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

/// A coordinator over a real SQLite store, a scripted fetcher and a manual
/// clock.
pub struct TestApp {
    pub sync: Arc<ProfileSync>,
    pub fetcher: Arc<FakeFetcher>,
    pub clock: Arc<ManualClock>,
    pub flags: Arc<MemoryFlags>,
}

impl TestApp {
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_config(SyncConfig::default())
    }

    pub fn with_config(config: SyncConfig) -> Result<Self, ConfigError> {
        let store = config.open_store()?;
        Self::build(&config, store, Arc::new(FakeFetcher::new()), Arc::new(MemoryFlags::default()))
    }

    /// An app whose database lives at `path`, sharing `fetcher` so a
    /// "restarted" app sees the same remote state.
    pub fn open_at(path: &Path, fetcher: Arc<FakeFetcher>) -> Result<Self, ConfigError> {
        let config = SyncConfig {
            database_path: Some(path.to_path_buf()),
            ..SyncConfig::default()
        };
        let store = config.open_store()?;
        Self::build(&config, store, fetcher, Arc::new(MemoryFlags::default()))
    }

    pub fn build(
        config: &SyncConfig,
        store: SqliteStore,
        fetcher: Arc<FakeFetcher>,
        flags: Arc<MemoryFlags>,
    ) -> Result<Self, ConfigError> {
        let clock = Arc::new(ManualClock::new(test_epoch()));
        let sync = ProfileSync::with_services(
            config,
            store,
            fetcher.clone(),
            flags.clone(),
            clock.clone(),
        )?;
        Ok(Self {
            sync: Arc::new(sync),
            fetcher,
            clock,
            flags,
        })
    }
}
