use std::sync::atomic::{AtomicBool, Ordering};

/// Settings surface mirroring whether a profile has been claimed. Used for
/// fast cold-start decisions only; the store remains the source of truth.
pub trait ProfileFlags: Send + Sync {
    fn has_claimed_profile(&self) -> bool;

    fn set_has_claimed_profile(&self, claimed: bool);
}

#[derive(Debug, Default)]
pub struct MemoryFlags {
    claimed: AtomicBool,
}

impl ProfileFlags for MemoryFlags {
    fn has_claimed_profile(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    fn set_has_claimed_profile(&self, claimed: bool) {
        self.claimed.store(claimed, Ordering::Release);
    }
}
