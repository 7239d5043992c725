//! Wall-clock access for expiry checks.
//!
//! Node expiry is stored as absolute unix seconds. Every expiry computation
//! takes an explicit `now`, and holders obtain it from an injected [`Clock`]
//! so tests can pin time.

use std::fmt::Debug;

/// Source of the current unix time in seconds.
pub trait Clock: Send + Sync + Debug {
    /// Current unix time in whole seconds.
    fn unix_seconds(&self) -> u64;
}

/// Clock backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_seconds(&self) -> u64 {
        unix_seconds_now()
    }
}

/// Current unix time in seconds according to the system clock.
pub fn unix_seconds_now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_after_2020() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.unix_seconds() > 1_577_836_800);
    }
}
