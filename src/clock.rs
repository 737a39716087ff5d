//! Monotonic time sources.
//!
//! The engine reads "now" exclusively through the [`Clock`] trait. Production
//! hosts install a [`MonotonicClock`]; tests drive a [`ManualClock`] so every
//! deadline and miss is reproducible to the nanosecond.

use crate::types::Time;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// A monotonic nanosecond time source.
pub trait Clock: Send + Sync {
    /// Returns the current timestamp. Must be non-decreasing across calls.
    fn now(&self) -> Time;
}

/// Wall-clock time, anchored at construction.
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Creates a clock whose origin is the moment of construction.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Time {
        Time::from_nanos(self.origin.elapsed().as_nanos() as u64)
    }
}

/// A clock advanced by hand, for tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ns: AtomicU64,
}

impl ManualClock {
    /// Creates a clock starting at `start`.
    #[must_use]
    pub fn new(start: Time) -> Self {
        Self {
            now_ns: AtomicU64::new(start.as_nanos()),
        }
    }

    /// Jumps the clock to `now`.
    pub fn set(&self, now: Time) {
        self.now_ns.store(now.as_nanos(), Ordering::Release);
    }

    /// Advances the clock by `nanos`.
    pub fn advance(&self, nanos: u64) {
        self.now_ns.fetch_add(nanos, Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Time {
        Time::from_nanos(self.now_ns.load(Ordering::Acquire))
    }
}
