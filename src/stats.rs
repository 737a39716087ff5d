//! Per-CPU aggregated engine counters.
//!
//! Counters are sharded so that hot-path increments never contend across
//! CPUs, and summed coherently on read. All values are cumulative since
//! engine start and monotonically non-decreasing.

use crate::shard;
use crossbeam_utils::CachePadded;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
struct ShardCounters {
    local_dispatches: AtomicU64,
    global_enqueues: AtomicU64,
    deadline_misses: AtomicU64,
    miss_duration_ns: AtomicU64,
    rate_limited_drops: AtomicU64,
    task_store_exhausted: AtomicU64,
}

/// Sharded monotonic counters for the scheduling engine.
#[derive(Debug)]
pub struct EngineStats {
    shards: Vec<CachePadded<ShardCounters>>,
}

impl EngineStats {
    /// Creates counters with `shards` independent slots (at least one).
    #[must_use]
    pub fn new(shards: usize) -> Self {
        let shards = (0..shards.max(1))
            .map(|_| CachePadded::new(ShardCounters::default()))
            .collect();
        Self { shards }
    }

    fn local(&self) -> &ShardCounters {
        &self.shards[shard::current(self.shards.len())]
    }

    /// Counts a wakeup dispatched directly to an idle CPU.
    pub(crate) fn incr_local_dispatches(&self) {
        self.local().local_dispatches.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts an enqueue into the global deadline order.
    pub(crate) fn incr_global_enqueues(&self) {
        self.local().global_enqueues.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts an emitted deadline-miss event of `miss_ns` lateness.
    pub(crate) fn record_miss(&self, miss_ns: u64) {
        let counters = self.local();
        counters.deadline_misses.fetch_add(1, Ordering::Relaxed);
        counters
            .miss_duration_ns
            .fetch_add(miss_ns, Ordering::Relaxed);
    }

    /// Counts a miss event suppressed by the limiter or dropped by the ring.
    pub(crate) fn incr_rate_limited_drops(&self) {
        self.local()
            .rate_limited_drops
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Counts an enqueue that fell back because the task store was full.
    pub(crate) fn incr_task_store_exhausted(&self) {
        self.local()
            .task_store_exhausted
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Sums all shards into a coherent snapshot.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        let mut snapshot = CounterSnapshot::default();
        for counters in &self.shards {
            snapshot.local_dispatches += counters.local_dispatches.load(Ordering::Relaxed);
            snapshot.global_enqueues += counters.global_enqueues.load(Ordering::Relaxed);
            snapshot.deadline_misses_total += counters.deadline_misses.load(Ordering::Relaxed);
            snapshot.miss_duration_ns_sum += counters.miss_duration_ns.load(Ordering::Relaxed);
            snapshot.rate_limited_drops += counters.rate_limited_drops.load(Ordering::Relaxed);
            snapshot.task_store_exhausted_total +=
                counters.task_store_exhausted.load(Ordering::Relaxed);
        }
        snapshot
    }
}

/// Cumulative counter values since engine start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    /// Wakeups dispatched directly to an idle CPU.
    pub local_dispatches: u64,
    /// Enqueues into the global deadline order.
    pub global_enqueues: u64,
    /// Deadline-miss events actually emitted.
    pub deadline_misses_total: u64,
    /// Sum of emitted miss durations, for average-miss derivation.
    pub miss_duration_ns_sum: u64,
    /// Miss events suppressed by rate limiting or ring overflow.
    pub rate_limited_drops: u64,
    /// Enqueues that took the fallback path because the task store was full.
    pub task_store_exhausted_total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn increments_land_in_the_snapshot() {
        let stats = EngineStats::new(4);

        stats.incr_global_enqueues();
        stats.incr_global_enqueues();
        stats.incr_local_dispatches();
        stats.record_miss(1_500);
        stats.record_miss(500);
        stats.incr_rate_limited_drops();
        stats.incr_task_store_exhausted();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.global_enqueues, 2);
        assert_eq!(snapshot.local_dispatches, 1);
        assert_eq!(snapshot.deadline_misses_total, 2);
        assert_eq!(snapshot.miss_duration_ns_sum, 2_000);
        assert_eq!(snapshot.rate_limited_drops, 1);
        assert_eq!(snapshot.task_store_exhausted_total, 1);
    }

    #[test]
    fn snapshot_sums_across_shards() {
        let stats = Arc::new(EngineStats::new(8));
        let per_thread = 10_000u64;

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let stats = Arc::clone(&stats);
                std::thread::spawn(move || {
                    for _ in 0..per_thread {
                        stats.incr_global_enqueues();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread panicked");
        }

        assert_eq!(stats.snapshot().global_enqueues, 4 * per_thread);
    }

    #[test]
    fn counters_are_monotone() {
        let stats = EngineStats::new(2);
        let mut previous = stats.snapshot();

        for step in 0..100u64 {
            match step % 4 {
                0 => stats.incr_global_enqueues(),
                1 => stats.record_miss(step),
                2 => stats.incr_rate_limited_drops(),
                _ => stats.incr_local_dispatches(),
            }
            let current = stats.snapshot();
            assert!(current.global_enqueues >= previous.global_enqueues);
            assert!(current.deadline_misses_total >= previous.deadline_misses_total);
            assert!(current.miss_duration_ns_sum >= previous.miss_duration_ns_sum);
            assert!(current.rate_limited_drops >= previous.rate_limited_drops);
            assert!(current.local_dispatches >= previous.local_dispatches);
            previous = current;
        }
    }
}
