use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use profilesync_core::{PlayerSnapshot, PlayerTag, RankingsSnapshot};
use profilesync_engine::{FetchError, RemoteFetcher};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scripted stand-in for the remote stats service.
#[derive(Default)]
pub struct FakeFetcher {
    players: Mutex<HashMap<PlayerTag, PlayerSnapshot>>,
    rankings: Mutex<HashMap<PlayerTag, RankingsSnapshot>>,
    failures: Mutex<VecDeque<FetchError>>,
    delay: Mutex<Option<Duration>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    calls: AtomicUsize,
    rankings_calls: AtomicUsize,
    abandoned: AtomicUsize,
}

/// Counts requests dropped before they produced a result.
struct InFlight<'a> {
    fetcher: &'a FakeFetcher,
    finished: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.fetcher.abandoned.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_player(&self, snapshot: PlayerSnapshot) {
        lock(&self.players)
            .insert(snapshot.tag.clone(), snapshot);
    }

    pub fn set_rankings(&self, tag: PlayerTag, rankings: RankingsSnapshot) {
        lock(&self.rankings).insert(tag, rankings);
    }

    /// The next fetch fails with `err`. Queued failures are used in order.
    pub fn fail_next(&self, err: FetchError) {
        lock(&self.failures).push_back(err);
    }

    /// Every request sleeps this long (in tokio time) before answering.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *lock(&self.delay) = delay;
    }

    /// Park every request until [`FakeFetcher::release`] is called.
    pub fn hold(&self) {
        *lock(&self.gate) = Some(Arc::new(Semaphore::new(0)));
    }

    /// Stop parking new requests. Requests already parked keep waiting on
    /// the returned gate until it gets a permit.
    pub fn detach_gate(&self) -> Option<Arc<Semaphore>> {
        lock(&self.gate).take()
    }

    pub fn release(&self) {
        if let Some(gate) = self.detach_gate() {
            gate.add_permits(1);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn rankings_calls(&self) -> usize {
        self.rankings_calls.load(Ordering::SeqCst)
    }

    pub fn abandoned(&self) -> usize {
        self.abandoned.load(Ordering::SeqCst)
    }

    async fn wait_turn(&self) -> Result<(), FetchError> {
        let gate = lock(&self.gate).clone();
        if let Some(gate) = gate {
            // Each waiter hands the permit back on drop, waking the next one.
            let _permit = gate
                .acquire()
                .await
                .map_err(|_| FetchError::Network("gate closed".into()))?;
        }
        let delay = *lock(&self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match lock(&self.failures).pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteFetcher for FakeFetcher {
    async fn fetch(&self, tag: &PlayerTag) -> Result<PlayerSnapshot, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut in_flight = InFlight {
            fetcher: self,
            finished: false,
        };
        let result = self.wait_turn().await.and_then(|()| {
            lock(&self.players)
                .get(tag)
                .cloned()
                .ok_or_else(|| FetchError::NotFound(tag.to_string()))
        });
        in_flight.finished = true;
        result
    }

    async fn fetch_rankings(&self, tag: &PlayerTag) -> Result<RankingsSnapshot, FetchError> {
        self.rankings_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_turn().await?;
        lock(&self.rankings)
            .get(tag)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(tag.to_string()))
    }
}
