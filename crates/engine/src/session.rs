use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};

use profilesync_core::{Clock, PlayerSnapshot};

struct Entry {
    snapshot: PlayerSnapshot,
    stored_at: DateTime<Utc>,
}

/// Size-one memory cache of the last searched player.
///
/// Entries expire `ttl` after they were stored; an expired entry is dropped by
/// the read that notices it.
pub struct SessionCache {
    slot: Mutex<Option<Entry>>,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl SessionCache {
    pub fn new(ttl: TimeDelta, clock: Arc<dyn Clock>) -> Self {
        Self {
            slot: Mutex::new(None),
            ttl,
            clock,
        }
    }

    pub fn put(&self, snapshot: PlayerSnapshot) {
        let entry = Entry {
            snapshot,
            stored_at: self.clock.now(),
        };
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(entry);
    }

    pub fn get(&self) -> Option<PlayerSnapshot> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let fresh = slot
            .as_ref()
            .is_some_and(|entry| self.clock.now() - entry.stored_at < self.ttl);
        if !fresh {
            *slot = None;
        }
        slot.as_ref().map(|entry| entry.snapshot.clone())
    }

    pub fn clear(&self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use profilesync_core::{ManualClock, PlayerTag};

    fn setup() -> (Arc<ManualClock>, SessionCache) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        ));
        let cache = SessionCache::new(TimeDelta::seconds(3600), clock.clone());
        (clock, cache)
    }

    fn snapshot(tag: &str) -> PlayerSnapshot {
        PlayerSnapshot::new(PlayerTag::parse(tag).unwrap(), "Visitor")
    }

    #[test]
    fn valid_just_under_ttl() {
        let (clock, cache) = setup();
        cache.put(snapshot("#2PP"));
        clock.advance(TimeDelta::seconds(3599));
        assert_eq!(cache.get(), Some(snapshot("#2PP")));
    }

    #[test]
    fn expires_at_ttl_and_stays_cleared() {
        let (clock, cache) = setup();
        cache.put(snapshot("#2PP"));
        clock.advance(TimeDelta::seconds(3600));
        assert_eq!(cache.get(), None);

        // Moving the clock back cannot resurrect the dropped entry.
        clock.advance(TimeDelta::seconds(-3600));
        assert_eq!(cache.get(), None);
    }

    #[test]
    fn put_replaces_and_restarts_ttl() {
        let (clock, cache) = setup();
        cache.put(snapshot("#2PP"));
        clock.advance(TimeDelta::minutes(50));
        cache.put(snapshot("#QY8R"));
        clock.advance(TimeDelta::minutes(50));
        assert_eq!(cache.get(), Some(snapshot("#QY8R")));
    }

    #[test]
    fn clear_empties_slot() {
        let (_clock, cache) = setup();
        cache.put(snapshot("#2PP"));
        cache.clear();
        assert_eq!(cache.get(), None);
    }
}
