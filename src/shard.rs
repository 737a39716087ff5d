//! Thread-to-shard assignment backing the per-CPU state.
//!
//! Host scheduling callbacks arrive on per-CPU threads. Each calling thread
//! gets a stable slot on first use, drawn from a process-wide monotonic
//! counter; threads beyond the shard count wrap around. With the intended
//! one-thread-per-CPU host, a shard is therefore updated only by its owning
//! CPU.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_THREAD_SLOT: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static THREAD_SLOT: usize = NEXT_THREAD_SLOT.fetch_add(1, Ordering::Relaxed);
}

/// Returns this thread's shard index within `shards` slots.
#[must_use]
pub fn current(shards: usize) -> usize {
    debug_assert!(shards > 0, "shard count must be nonzero");
    THREAD_SLOT.with(|slot| slot % shards.max(1))
}

/// Default shard count: one per available CPU.
#[must_use]
pub fn default_shard_count() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}
