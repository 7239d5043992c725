//! Controllable time.

use std::sync::atomic::{AtomicU64, Ordering};
use warden_core::Clock;

/// Clock that stands still until advanced.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// A clock frozen at `now` unix seconds.
    pub fn at(now: u64) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    /// Current instant.
    pub fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    /// Jump to `now`.
    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move forward by `seconds`.
    pub fn advance(&self, seconds: u64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    /// 2024-01-01T00:00:00Z
    fn default() -> Self {
        Self::at(1_704_067_200)
    }
}

impl Clock for ManualClock {
    fn unix_seconds(&self) -> u64 {
        self.now()
    }
}
