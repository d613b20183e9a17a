pub mod config;
pub mod error;
pub mod events;
pub mod fetch;
pub mod flags;
pub mod session;

pub use config::SyncConfig;
pub use error::{ConfigError, SyncError};
pub use events::{EventBus, ProfileEvent};
pub use fetch::{FetchError, RemoteFetcher, join_with_timeout};
pub use flags::{MemoryFlags, ProfileFlags};
pub use session::SessionCache;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, instrument, warn};

use profilesync_core::{
    Clock, DailyReset, PlayerSnapshot, PlayerTag, RankingsSnapshot, SystemClock, merge_snapshots,
};
use profilesync_storage::{PersistedPlayerRecord, PlayerStore, SqliteStore, StorageError};

/// What the profile slot currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfilePhase {
    Idle,
    CheckingExistence,
    NotFound,
    LoadingCached,
    /// Cached data is on screen while the remote copy is fetched.
    Reconciling(PlayerSnapshot),
    Ready(PlayerSnapshot),
}

impl ProfilePhase {
    pub fn snapshot(&self) -> Option<&PlayerSnapshot> {
        match self {
            Self::Reconciling(s) | Self::Ready(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileLoad {
    Found(PlayerSnapshot),
    NotFound,
}

/// Held for the duration of a refresh. Dropping it, on any exit path,
/// aborts a still-running fetch and reopens the slot for the next refresh.
struct RefreshGuard<'a> {
    refreshing: &'a AtomicBool,
    task: &'a Mutex<Option<AbortHandle>>,
}

impl<'a> RefreshGuard<'a> {
    fn acquire(refreshing: &'a AtomicBool, task: &'a Mutex<Option<AbortHandle>>) -> Option<Self> {
        refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(Self { refreshing, task })
    }

    fn track(&self, handle: AbortHandle) {
        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.task.lock().unwrap_or_else(PoisonError::into_inner).take() {
            handle.abort();
        }
        self.refreshing.store(false, Ordering::Release);
    }
}

/// Owns the "my profile" slot: decides between cache and network, merges
/// remote data into the stored record and publishes the result.
pub struct ProfileSync<S: PlayerStore = SqliteStore> {
    store: Mutex<S>,
    fetcher: Arc<dyn RemoteFetcher>,
    flags: Arc<dyn ProfileFlags>,
    clock: Arc<dyn Clock>,
    session: SessionCache,
    events: EventBus,
    phase: watch::Sender<ProfilePhase>,
    reset: DailyReset,
    fetch_timeout: Duration,
    refreshing: AtomicBool,
    refresh_task: Mutex<Option<AbortHandle>>,
    /// Bumped whenever the slot changes owner; in-flight results captured
    /// under an older value are discarded.
    generation: AtomicU64,
}

impl<S: PlayerStore> ProfileSync<S> {
    pub fn new(
        config: &SyncConfig,
        store: S,
        fetcher: Arc<dyn RemoteFetcher>,
    ) -> Result<Self, ConfigError> {
        Self::with_services(
            config,
            store,
            fetcher,
            Arc::new(MemoryFlags::default()),
            Arc::new(SystemClock),
        )
    }

    pub fn with_services(
        config: &SyncConfig,
        store: S,
        fetcher: Arc<dyn RemoteFetcher>,
        flags: Arc<dyn ProfileFlags>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let (phase, _) = watch::channel(ProfilePhase::Idle);
        Ok(Self {
            store: Mutex::new(store),
            fetcher,
            flags,
            session: SessionCache::new(config.session_ttl(), Arc::clone(&clock)),
            clock,
            events: EventBus::new(config.event_capacity),
            phase,
            reset: config.daily_reset()?,
            fetch_timeout: config.fetch_timeout(),
            refreshing: AtomicBool::new(false),
            refresh_task: Mutex::new(None),
            generation: AtomicU64::new(0),
        })
    }

    fn store(&self) -> MutexGuard<'_, S> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the underlying store.
    pub fn with_store<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let store = self.store();
        f(&*store)
    }

    pub fn flags(&self) -> &dyn ProfileFlags {
        self.flags.as_ref()
    }

    pub fn phase(&self) -> ProfilePhase {
        self.phase.borrow().clone()
    }

    /// The snapshot currently on screen, if any.
    pub fn current(&self) -> Option<PlayerSnapshot> {
        self.phase.borrow().snapshot().cloned()
    }

    pub fn subscribe_profile(&self) -> watch::Receiver<ProfilePhase> {
        self.phase.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ProfileEvent> {
        self.events.subscribe()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }

    pub fn next_reset(&self) -> DateTime<Utc> {
        self.reset.next_after(self.clock.now())
    }

    fn publish(&self, phase: ProfilePhase) {
        self.phase.send_replace(phase);
    }

    fn bump_generation(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Write `snapshot` as my profile unless the slot changed owner since
    /// `generation` was read. Owner changes bump the generation while holding
    /// the store lock, so the check and the write cannot interleave with one.
    fn persist_if_current(
        &self,
        snapshot: &PlayerSnapshot,
        generation: u64,
    ) -> Result<Option<PersistedPlayerRecord>, StorageError> {
        let mut store = self.store();
        if self.generation.load(Ordering::Acquire) != generation {
            return Ok(None);
        }
        store
            .upsert_as_my_profile(snapshot, self.clock.now())
            .map(Some)
    }

    fn spawn_fetch(&self, tag: PlayerTag) -> JoinHandle<Result<PlayerSnapshot, fetch::FetchError>> {
        let fetcher = Arc::clone(&self.fetcher);
        tokio::spawn(async move { fetcher.fetch(&tag).await })
    }

    async fn fetch_bounded(&self, tag: &PlayerTag) -> Result<PlayerSnapshot, SyncError> {
        join_with_timeout(self.spawn_fetch(tag.clone()), self.fetch_timeout).await
    }

    fn parse_tag(input: &str) -> Result<PlayerTag, SyncError> {
        PlayerTag::parse(input).map_err(|e| SyncError::InvalidTag(e.to_string()))
    }

    /// Bring the settings flag back in line with what the store says.
    fn reconcile_flag(&self, exists: bool) {
        if self.flags.has_claimed_profile() != exists {
            warn!(exists, "claimed-profile flag disagreed with store; correcting");
            self.flags.set_has_claimed_profile(exists);
        }
    }

    fn read_my_profile(&self) -> Option<(PlayerSnapshot, [u8; 32])> {
        let record = match self.store().get_my_profile() {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(err) => {
                warn!(error = %err, "failed to read stored profile");
                return None;
            }
        };
        match record.to_snapshot() {
            Ok(snapshot) => Some((snapshot, record.content_hash)),
            Err(err) => {
                warn!(tag = %record.tag, error = %err, "stored profile could not be decoded");
                None
            }
        }
    }

    /// Show the stored profile right away, then reconcile it with the remote
    /// copy. Network and storage failures on this path are logged, never
    /// returned: the cached profile stands in.
    #[instrument(skip(self))]
    pub async fn load_profile(&self) -> ProfileLoad {
        self.publish(ProfilePhase::CheckingExistence);
        let generation = self.generation.load(Ordering::Acquire);

        let exists = match self.store().has_my_profile() {
            Ok(exists) => exists,
            Err(err) => {
                warn!(error = %err, "profile existence check failed");
                self.publish(ProfilePhase::NotFound);
                return ProfileLoad::NotFound;
            }
        };
        self.reconcile_flag(exists);
        if !exists {
            debug!("no claimed profile");
            self.publish(ProfilePhase::NotFound);
            return ProfileLoad::NotFound;
        }

        self.publish(ProfilePhase::LoadingCached);
        let Some((cached, cached_hash)) = self.read_my_profile() else {
            self.publish(ProfilePhase::NotFound);
            return ProfileLoad::NotFound;
        };
        self.publish(ProfilePhase::Reconciling(cached.clone()));

        let fresh = match self.fetch_bounded(&cached.tag).await {
            Ok(fresh) => fresh,
            Err(err) => {
                warn!(
                    tag = %cached.tag,
                    error = %err,
                    transient = err.is_transient(),
                    "background fetch failed; keeping cached profile"
                );
                self.publish(ProfilePhase::Ready(cached.clone()));
                return ProfileLoad::Found(cached);
            }
        };

        let merged = merge_snapshots(&cached, fresh);
        let changed = match self.persist_if_current(&merged, generation) {
            Ok(Some(record)) => record.content_hash != cached_hash,
            Ok(None) => {
                debug!(tag = %cached.tag, "profile slot changed during load; dropping fetched data");
                return self.current().map_or(ProfileLoad::NotFound, ProfileLoad::Found);
            }
            Err(err) => {
                warn!(tag = %merged.tag, error = %err, "failed to persist reconciled profile");
                merged != cached
            }
        };
        self.publish(ProfilePhase::Ready(merged.clone()));
        if changed {
            self.events.emit(ProfileEvent::ProfileUpdated);
        }
        info!(tag = %merged.tag, changed, "profile reconciled");
        ProfileLoad::Found(merged)
    }

    /// User-triggered refresh of the loaded profile. At most one runs at a
    /// time; a second call fails with [`SyncError::RefreshInProgress`]
    /// without doing any I/O.
    #[instrument(skip(self))]
    pub async fn refresh_profile(&self) -> Result<PlayerSnapshot, SyncError> {
        let Some(current) = self.current() else {
            return Err(SyncError::NoData);
        };
        let guard = RefreshGuard::acquire(&self.refreshing, &self.refresh_task)
            .ok_or(SyncError::RefreshInProgress)?;
        let generation = self.generation.load(Ordering::Acquire);

        let handle = self.spawn_fetch(current.tag.clone());
        guard.track(handle.abort_handle());
        let fresh = match join_with_timeout(handle, self.fetch_timeout).await {
            Ok(fresh) => fresh,
            Err(err) => {
                warn!(tag = %current.tag, error = %err, "profile refresh failed");
                return Err(err);
            }
        };

        let merged = merge_snapshots(&current, fresh);
        match self.persist_if_current(&merged, generation) {
            Ok(Some(_)) => {}
            Ok(None) => return Err(SyncError::Superseded),
            Err(err) => {
                warn!(tag = %merged.tag, error = %err, "failed to persist refreshed profile");
                return Err(err.into());
            }
        }
        self.publish(ProfilePhase::Ready(merged.clone()));
        self.events.emit(ProfileEvent::ProfileUpdated);
        info!(tag = %merged.tag, "profile refreshed");
        Ok(merged)
    }

    /// Abort the running refresh, which then fails with
    /// [`SyncError::Cancelled`]. Returns false when nothing was running.
    pub fn cancel_refresh(&self) -> bool {
        let handle = self
            .refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match handle {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Refresh only when a daily reset boundary has passed since the stored
    /// profile was last refreshed. Returns whether a refresh ran.
    pub async fn refresh_if_stale(&self) -> Result<bool, SyncError> {
        let last_refresh = self.store().get_my_profile()?.map(|r| r.refreshed_at);
        let Some(last_refresh) = last_refresh else {
            return Ok(false);
        };
        if !self.reset.should_refresh(Some(last_refresh), self.clock.now()) {
            return Ok(false);
        }
        self.refresh_profile().await?;
        Ok(true)
    }

    /// Claim `tag` as my profile. Always fetches the full player first so the
    /// stored record has complete progression data; on fetch failure the
    /// store is left untouched.
    #[instrument(skip(self))]
    pub async fn save_as_my_profile(&self, tag: &str) -> Result<PlayerSnapshot, SyncError> {
        let tag = Self::parse_tag(tag)?;
        let fresh = self.fetch_bounded(&tag).await?;

        let record = {
            let mut store = self.store();
            let record = store.upsert_as_my_profile(&fresh, self.clock.now())?;
            self.bump_generation();
            record
        };
        let snapshot = record.to_snapshot()?;
        self.flags.set_has_claimed_profile(true);
        if self.session.get().is_some_and(|s| s.tag == snapshot.tag) {
            self.session.clear();
        }
        self.publish(ProfilePhase::Ready(snapshot.clone()));
        self.events.emit(ProfileEvent::ProfileUpdated);
        info!(tag = %snapshot.tag, "profile claimed");
        Ok(snapshot)
    }

    /// Delete the claimed profile. Returns how many flagged records were
    /// removed.
    pub fn remove_my_profile(&self) -> Result<usize, SyncError> {
        let removed = {
            let mut store = self.store();
            let removed = store.remove_my_profile()?;
            self.bump_generation();
            removed
        };
        if removed > 1 {
            warn!(removed, "more than one record was flagged as my profile");
        }
        self.flags.set_has_claimed_profile(false);
        self.publish(ProfilePhase::NotFound);
        if removed > 0 {
            self.events.emit(ProfileEvent::ProfileRemoved);
        }
        info!(removed, "profile removed");
        Ok(removed)
    }

    /// Wipe every stored record and the session cache.
    pub fn reset_all_data(&self) -> Result<(), SyncError> {
        {
            let mut store = self.store();
            store.clear_all()?;
            self.bump_generation();
        }
        self.flags.set_has_claimed_profile(false);
        self.session.clear();
        self.publish(ProfilePhase::NotFound);
        self.events.emit(ProfileEvent::ProfileRemoved);
        info!("all player data cleared");
        Ok(())
    }

    /// Look up any player. The result is kept in the session cache only.
    #[instrument(skip(self))]
    pub async fn search_player(&self, tag: &str) -> Result<PlayerSnapshot, SyncError> {
        let tag = Self::parse_tag(tag)?;
        let snapshot = self.fetch_bounded(&tag).await?;
        self.session.put(snapshot.clone());
        Ok(snapshot)
    }

    pub fn last_searched(&self) -> Option<PlayerSnapshot> {
        self.session.get()
    }

    pub fn clear_last_searched(&self) {
        self.session.clear();
    }

    /// Leaderboard placement for `tag`; any failure reads as unranked.
    pub async fn rankings(&self, tag: &PlayerTag) -> RankingsSnapshot {
        let fetcher = Arc::clone(&self.fetcher);
        let owned = tag.clone();
        let handle = tokio::spawn(async move { fetcher.fetch_rankings(&owned).await });
        match join_with_timeout(handle, self.fetch_timeout).await {
            Ok(rankings) => rankings,
            Err(err) => {
                debug!(%tag, error = %err, "rankings unavailable");
                RankingsSnapshot::unranked()
            }
        }
    }
}
