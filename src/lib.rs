//! Slosched: an SLO-aware earliest-deadline-first scheduling engine core.
//!
//! # Overview
//!
//! Slosched enforces service-level latency budgets on CPU scheduling by
//! ordering runnable tasks earliest-deadline-first. Each workload carries a
//! latency budget and an importance weight; every enqueue derives an absolute
//! deadline from both. At stop time the engine compares "now" against the
//! deadline stored at enqueue, so misses caused by scheduling delay are
//! detected, not merely misses caused by long runtime.
//!
//! The engine is the core of a larger system: configuration discovery, the
//! CLI, the metrics surface, and the OS integration that actually runs tasks
//! are external collaborators. The engine consumes a config source and a
//! monotonic clock, and produces dispatch orders, miss events, and counters.
//!
//! # Core Guarantees
//!
//! - **Fail closed**: hostile or corrupted configuration degrades to default
//!   scheduling, never to a priority escalation.
//! - **Hard bounds**: workload and task storage reject at capacity; nothing
//!   is silently evicted and no task is silently dropped.
//! - **Bounded observability**: miss events are rate-limited per CPU and
//!   flow through a bounded wait-free ring, so reporting can never become a
//!   denial-of-service vector.
//! - **No hot-path failure**: the scheduling callbacks never return errors,
//!   never panic, and never block on I/O.
//!
//! # Module Structure
//!
//! - [`types`]: identifiers, time, and per-workload configuration
//! - [`clock`]: monotonic time sources (production and test)
//! - [`config`]: validation and the bounded workload config store
//! - [`engine`]: the scheduler state machine, deadline queue, task contexts
//! - [`limiter`]: per-CPU fixed-window rate limiting for miss events
//! - [`events`]: the bounded miss-event ring, consumer, and wire format
//! - [`stats`]: per-CPU sharded monotonic counters
//! - [`shard`]: thread-to-shard assignment backing the per-CPU state

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]

pub mod clock;
pub mod config;
pub mod engine;
pub mod events;
pub mod limiter;
pub mod shard;
pub mod stats;
pub mod types;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{ConfigError, ConfigStore};
pub use engine::{
    CpuPick, CpuSelection, CpuTopology, DispatchOrder, EngineConfig, SloEngine, TaskCtx,
};
pub use events::{CodecError, DeadlineEvent, EventConsumer, EVENT_WIRE_SIZE};
pub use stats::CounterSnapshot;
pub use types::{
    SloCfg, TaskId, Time, WorkloadId, DEFAULT_BUDGET_NS, DEFAULT_IMPORTANCE, MAX_BUDGET_NS,
    MAX_IMPORTANCE, MAX_TASKS, MAX_WORKLOADS, MIN_BUDGET_NS, MIN_IMPORTANCE,
};
