use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::TimeDelta;
use serde::Deserialize;

use profilesync_core::DailyReset;
use profilesync_core::reset::DEFAULT_RESET_HOUR_UTC;
use profilesync_storage::SqliteStore;

use crate::error::ConfigError;

pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 60 * 60;
pub const DEFAULT_EVENT_CAPACITY: usize = 16;

/// Tunables for the sync core, usually read from a TOML file.
///
/// ```toml
/// fetch_timeout_secs = 10
/// session_ttl_secs = 3600
/// reset_hour_utc = 5
/// database_path = "profile.db"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    pub fetch_timeout_secs: u64,
    pub session_ttl_secs: u64,
    pub reset_hour_utc: u32,
    pub event_capacity: usize,
    /// In-memory store when unset.
    pub database_path: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            reset_hour_utc: DEFAULT_RESET_HOUR_UTC,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            database_path: None,
        }
    }
}

impl SyncConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid("fetch_timeout_secs must be positive".into()));
        }
        if self.session_ttl_secs == 0 {
            return Err(ConfigError::Invalid("session_ttl_secs must be positive".into()));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::Invalid("event_capacity must be positive".into()));
        }
        DailyReset::new(self.reset_hour_utc)?;
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn session_ttl(&self) -> TimeDelta {
        i64::try_from(self.session_ttl_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }

    pub fn daily_reset(&self) -> Result<DailyReset, ConfigError> {
        Ok(DailyReset::new(self.reset_hour_utc)?)
    }

    pub fn open_store(&self) -> Result<SqliteStore, ConfigError> {
        let store = match &self.database_path {
            Some(path) => SqliteStore::open(path)?,
            None => SqliteStore::open_in_memory()?,
        };
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use profilesync_storage::PlayerStore;

    #[test]
    fn empty_file_uses_defaults() {
        let config = SyncConfig::from_toml_str("").unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.session_ttl(), TimeDelta::hours(1));
    }

    #[test]
    fn overrides_fields() {
        let config = SyncConfig::from_toml_str(
            "fetch_timeout_secs = 3\nreset_hour_utc = 8\ndatabase_path = \"/tmp/p.db\"\n",
        )
        .unwrap();
        assert_eq!(config.fetch_timeout_secs, 3);
        assert_eq!(config.daily_reset().unwrap().hour(), 8);
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/p.db")));
        assert_eq!(config.session_ttl_secs, DEFAULT_SESSION_TTL_SECS);
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(matches!(
            SyncConfig::from_toml_str("fetch_timeout = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            SyncConfig::from_toml_str("reset_hour_utc = 24"),
            Err(ConfigError::Value(_))
        ));
        assert!(matches!(
            SyncConfig::from_toml_str("fetch_timeout_secs = 0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn load_and_open_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("profile.db");
        let config_path = dir.path().join("sync.toml");
        std::fs::write(&config_path, format!("database_path = {:?}\n", db.to_str().unwrap())).unwrap();

        let config = SyncConfig::load(&config_path).unwrap();
        let store = config.open_store().unwrap();
        assert!(!store.has_my_profile().unwrap());
        assert!(db.exists());
    }
}
