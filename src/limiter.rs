//! Per-CPU fixed-window rate limiting for miss events.
//!
//! Miss reporting must never become a denial-of-service vector: a workload
//! that misses every deadline on every CPU could otherwise flood the event
//! ring. Each shard grants at most [`MAX_EVENTS_PER_WINDOW`] events per
//! [`WINDOW_NS`] window, and suppresses the rest.

use crate::shard;
use crate::types::Time;
use crossbeam_utils::CachePadded;
use parking_lot::Mutex;

/// Events granted per window per shard.
pub const MAX_EVENTS_PER_WINDOW: u64 = 1_000;

/// Window length: one second.
pub const WINDOW_NS: u64 = 1_000_000_000;

#[derive(Debug, Default)]
struct Window {
    start: Time,
    count: u64,
}

/// A per-shard fixed-window event limiter.
#[derive(Debug)]
pub struct RateLimiter {
    shards: Vec<CachePadded<Mutex<Window>>>,
}

impl RateLimiter {
    /// Creates a limiter with `shards` independent windows (at least one).
    #[must_use]
    pub fn new(shards: usize) -> Self {
        let shards = (0..shards.max(1))
            .map(|_| CachePadded::new(Mutex::new(Window::default())))
            .collect();
        Self { shards }
    }

    /// Grants or suppresses an event observed at `now`.
    ///
    /// The window restarts once more than [`WINDOW_NS`] has elapsed since
    /// its start. Fails closed: when the shard state cannot be accessed the
    /// event is suppressed, never granted.
    #[must_use]
    pub fn allow(&self, now: Time) -> bool {
        let Some(slot) = self.shards.get(shard::current(self.shards.len())) else {
            return false;
        };
        let Some(mut window) = slot.try_lock() else {
            return false;
        };

        if now.duration_since(window.start) > WINDOW_NS {
            window.start = now;
            window.count = 0;
        }
        if window.count >= MAX_EVENTS_PER_WINDOW {
            return false;
        }
        window.count += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grants_up_to_the_window_limit() {
        let limiter = RateLimiter::new(1);
        let now = Time::from_secs(2);

        for _ in 0..MAX_EVENTS_PER_WINDOW {
            assert!(limiter.allow(now));
        }
        assert!(!limiter.allow(now));
        assert!(!limiter.allow(now));
    }

    #[test]
    fn window_rollover_resets_the_count() {
        let limiter = RateLimiter::new(1);
        let start = Time::from_secs(2);

        for _ in 0..MAX_EVENTS_PER_WINDOW {
            assert!(limiter.allow(start));
        }
        assert!(!limiter.allow(start));

        // Exactly WINDOW_NS later is still the same window (strict >).
        let edge = start.saturating_add_nanos(WINDOW_NS);
        assert!(!limiter.allow(edge));

        // One nanosecond past the window, counting starts over.
        let past = start.saturating_add_nanos(WINDOW_NS + 1);
        assert!(limiter.allow(past));
    }

    #[test]
    fn independent_windows_per_shard() {
        let limiter = std::sync::Arc::new(RateLimiter::new(64));
        let now = Time::from_secs(2);

        // Exhaust this thread's shard.
        while limiter.allow(now) {}

        // Other threads land on other shards and still get grants.
        let granted: Vec<bool> = (0..4)
            .map(|_| {
                let other = std::sync::Arc::clone(&limiter);
                std::thread::spawn(move || other.allow(now))
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|handle| handle.join().expect("thread panicked"))
            .collect();
        assert!(granted.iter().any(|&ok| ok));
    }
}
