//! The SLO scheduler state machine.
//!
//! [`SloEngine`] receives the host's task transitions and maintains the EDF
//! order. Per task the lifecycle is `Idle → Runnable → Running → (Runnable |
//! Idle)`; the host triggers every transition, the engine never self-triggers.
//!
//! - [`enqueue`](SloEngine::enqueue) derives the absolute deadline from the
//!   workload's validated budget and importance weight and inserts the task
//!   into the deadline queue.
//! - [`running`](SloEngine::running) records when the task actually got CPU.
//! - [`stopping`](SloEngine::stopping) detects a deadline miss against the
//!   absolute deadline stored at enqueue — so misses caused by scheduling
//!   delay are caught, not merely misses caused by long runtime — and emits
//!   a rate-limited event.
//! - [`dispatch`](SloEngine::dispatch) hands the host the next task to run.
//!
//! No transition ever returns an error: every failure mode degrades to a
//! defined fallback (default budget, fallback enqueue, suppressed event).

pub mod deadline;
pub mod queue;
pub mod task_store;

pub use self::task_store::TaskCtx;

use self::queue::DeadlineQueue;
use self::task_store::TaskCtxStore;
use crate::clock::Clock;
use crate::config::{ConfigError, ConfigStore};
use crate::events::{DeadlineEvent, EventConsumer, EventRing, EVENT_RING_CAPACITY};
use crate::limiter::RateLimiter;
use crate::shard;
use crate::stats::{CounterSnapshot, EngineStats};
use crate::types::{SloCfg, TaskId, Time, WorkloadId, DEFAULT_IMPORTANCE, MAX_TASKS, MAX_WORKLOADS};
use crossbeam_queue::SegQueue;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Host interface for CPU selection.
///
/// The engine consults the host for a candidate CPU on wakeup; the host also
/// reports whether that candidate is currently idle.
pub trait CpuTopology: Send + Sync {
    /// Picks a candidate CPU for a waking task.
    fn pick_cpu(&self, tid: TaskId, prev_cpu: u32, wake_flags: u64) -> CpuPick;
}

/// A host CPU-selection answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuPick {
    /// The candidate CPU.
    pub cpu: u32,
    /// Whether the candidate is idle right now.
    pub is_idle: bool,
}

/// Outcome of [`SloEngine::select_cpu`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuSelection {
    /// The candidate CPU to report back to the host.
    pub cpu: u32,
    /// True when the engine signalled a direct local dispatch (the
    /// candidate was idle). The actual local insertion is the host's job.
    pub direct_dispatch: bool,
}

/// The next task the host should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOrder {
    /// The task to run.
    pub tid: TaskId,
    /// Its EDF deadline; absent for fallback (context-less) tasks.
    pub deadline: Option<Time>,
}

/// Engine construction parameters.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Per-CPU shard count for counters and rate limiting.
    pub shards: usize,
    /// Miss-event ring capacity in records.
    pub event_capacity: usize,
    /// Workload config slots.
    pub max_workloads: usize,
    /// Tracked task slots.
    pub max_tasks: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            shards: shard::default_shard_count(),
            event_capacity: EVENT_RING_CAPACITY,
            max_workloads: MAX_WORKLOADS,
            max_tasks: MAX_TASKS,
        }
    }
}

/// The hot scheduling shard: task contexts and the deadline queue move
/// together under one lock so single-task sequences serialize.
#[derive(Debug)]
struct SchedState {
    tasks: TaskCtxStore,
    queue: DeadlineQueue,
}

/// The SLO scheduling engine core.
///
/// One instance per host attach; tests instantiate their own (no process
/// singletons). Construction wires in the sole time source and, optionally,
/// a [`CpuTopology`] for wakeup placement.
pub struct SloEngine {
    clock: Arc<dyn Clock>,
    topology: Option<Arc<dyn CpuTopology>>,
    configs: ConfigStore,
    sched: Mutex<SchedState>,
    fallback: SegQueue<TaskId>,
    limiter: RateLimiter,
    events: EventRing,
    stats: EngineStats,
}

impl std::fmt::Debug for SloEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SloEngine")
            .field("workloads", &self.configs.len())
            .field("queued_events", &self.events.len())
            .finish_non_exhaustive()
    }
}

impl SloEngine {
    /// Creates an engine with default capacities.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_config(EngineConfig::default(), clock)
    }

    /// Creates an engine with explicit capacities.
    #[must_use]
    pub fn with_config(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        debug!(
            shards = config.shards,
            event_capacity = config.event_capacity,
            max_workloads = config.max_workloads,
            max_tasks = config.max_tasks,
            "initializing slo engine"
        );
        Self {
            clock,
            topology: None,
            configs: ConfigStore::with_capacity(config.max_workloads),
            sched: Mutex::new(SchedState {
                tasks: TaskCtxStore::with_capacity(config.max_tasks),
                queue: DeadlineQueue::new(),
            }),
            fallback: SegQueue::new(),
            limiter: RateLimiter::new(config.shards),
            events: EventRing::with_capacity(config.event_capacity),
            stats: EngineStats::new(config.shards),
        }
    }

    /// Installs the host's CPU topology for wakeup placement.
    #[must_use]
    pub fn with_topology(mut self, topology: Arc<dyn CpuTopology>) -> Self {
        self.topology = Some(topology);
        self
    }

    // ── Config source interface ────────────────────────────────────────

    /// Validates and stores or replaces the configuration for `wid`.
    pub fn upsert(&self, wid: WorkloadId, cfg: SloCfg) -> Result<(), ConfigError> {
        self.configs.upsert(wid, cfg)
    }

    /// Removes the configuration for `wid`. Returns true iff one existed.
    pub fn remove(&self, wid: WorkloadId) -> bool {
        self.configs.remove(wid)
    }

    /// Read access to the config store.
    #[must_use]
    pub fn configs(&self) -> &ConfigStore {
        &self.configs
    }

    // ── Host scheduling callbacks ──────────────────────────────────────

    /// Consults the host for a wakeup CPU.
    ///
    /// When the host reports the candidate idle, the engine counts a local
    /// dispatch and signals it in the return value; the insertion itself is
    /// delegated to the host. Observational only for engine state.
    pub fn select_cpu(&self, tid: TaskId, prev_cpu: u32, wake_flags: u64) -> CpuSelection {
        let pick = self.topology.as_ref().map_or(
            CpuPick {
                cpu: prev_cpu,
                is_idle: false,
            },
            |topology| topology.pick_cpu(tid, prev_cpu, wake_flags),
        );

        if pick.is_idle {
            self.stats.incr_local_dispatches();
        }
        CpuSelection {
            cpu: pick.cpu,
            direct_dispatch: pick.is_idle,
        }
    }

    /// Marks `tid` runnable for the workload it currently belongs to.
    ///
    /// Derives the absolute deadline `now + budget · (101 − importance) / 100`
    /// (saturating) and inserts the task into the deadline queue. With the
    /// task store at capacity the task goes to the fallback FIFO instead —
    /// still dispatched, never dropped.
    pub fn enqueue(&self, tid: TaskId, wid: WorkloadId, _enq_flags: u64) {
        self.stats.incr_global_enqueues();

        let now = self.clock.now();
        let budget_ns = self.configs.safe_budget(wid);
        let importance = self
            .configs
            .get(wid)
            .map_or(DEFAULT_IMPORTANCE, |cfg| cfg.importance);
        let eff = deadline::effective_budget(budget_ns, importance);
        let task_deadline = deadline::deadline_for(now, eff);

        let mut sched = self.sched.lock();
        let tracked = match sched.tasks.get_or_create(tid) {
            Some(ctx) => {
                ctx.deadline = task_deadline;
                ctx.budget_ns = budget_ns;
                ctx.start_time = Time::ZERO;
                ctx.valid = true;
                true
            }
            None => false,
        };
        if tracked {
            sched.queue.insert(tid, task_deadline);
        } else {
            drop(sched);
            self.stats.incr_task_store_exhausted();
            self.fallback.push(tid);
        }
    }

    /// Marks `tid` as actually running; records the start timestamp.
    ///
    /// No queue effects.
    pub fn running(&self, tid: TaskId) {
        let now = self.clock.now();
        let mut sched = self.sched.lock();
        if let Some(ctx) = sched.tasks.get(tid) {
            if ctx.valid {
                ctx.start_time = now;
            }
        }
    }

    /// Marks `tid` as leaving the CPU.
    ///
    /// Detects a deadline miss strictly (`now > deadline`; stopping exactly
    /// at the deadline is on-time) and, when the rate limiter permits, emits
    /// a [`DeadlineEvent`] attributed to `wid`. With `runnable == false` the
    /// task's context and queue entry are cleaned up; otherwise the context
    /// stays for the next enqueue to re-initialize.
    pub fn stopping(&self, tid: TaskId, wid: WorkloadId, runnable: bool) {
        let now = self.clock.now();
        let mut miss_ns = None;

        {
            let mut sched = self.sched.lock();
            let Some(ctx) = sched.tasks.get(tid) else {
                return;
            };
            if !ctx.valid {
                return;
            }
            if deadline::is_missed(now, ctx.deadline) {
                miss_ns = Some(now.duration_since(ctx.deadline));
            }
            if !runnable {
                sched.queue.remove(tid);
                sched.tasks.remove(tid);
            }
        }

        if let Some(miss_ns) = miss_ns {
            self.report_miss(wid, miss_ns, now);
        }
    }

    /// Pre-creates a context for a newly enabled task.
    ///
    /// The context stays invalid until the first enqueue initializes it.
    /// Silently does nothing when the task store is full.
    pub fn enable(&self, tid: TaskId) {
        let mut sched = self.sched.lock();
        let _ = sched.tasks.get_or_create(tid);
    }

    /// Hands the host the next task to run.
    ///
    /// Earliest-deadline task first; when the deadline queue is empty the
    /// fallback FIFO drains, so context-less tasks always run eventually.
    #[must_use]
    pub fn dispatch(&self) -> Option<DispatchOrder> {
        {
            let mut sched = self.sched.lock();
            if let Some((tid, task_deadline)) = sched.queue.pop_min() {
                return Some(DispatchOrder {
                    tid,
                    deadline: Some(task_deadline),
                });
            }
        }
        self.fallback.pop().map(|tid| DispatchOrder {
            tid,
            deadline: None,
        })
    }

    /// Cold-path teardown on host detach: empties scheduling state.
    ///
    /// Workload configuration survives detach; a host that wants a blank
    /// slate drops the engine.
    pub fn detach(&self) {
        let (tracked, queued) = {
            let mut sched = self.sched.lock();
            let counts = (sched.tasks.len(), sched.queue.len());
            sched.queue.clear();
            sched.tasks.clear();
            counts
        };
        while self.fallback.pop().is_some() {}
        debug!(tracked, queued, "engine detached");
    }

    // ── Observability interfaces ───────────────────────────────────────

    /// Creates the consumer handle for the miss-event ring.
    #[must_use]
    pub fn event_consumer(&self) -> EventConsumer {
        self.events.consumer()
    }

    /// Sums the per-CPU counters into a coherent snapshot.
    #[must_use]
    pub fn read_counters(&self) -> CounterSnapshot {
        self.stats.snapshot()
    }

    /// Returns a copy of the tracked context for `tid`, if any.
    #[must_use]
    pub fn context(&self, tid: TaskId) -> Option<TaskCtx> {
        let mut sched = self.sched.lock();
        sched.tasks.get(tid).map(|ctx| *ctx)
    }

    /// Number of currently tracked task contexts.
    #[must_use]
    pub fn tracked_tasks(&self) -> usize {
        self.sched.lock().tasks.len()
    }

    /// Number of tasks currently queued for dispatch (EDF order only).
    #[must_use]
    pub fn queued_tasks(&self) -> usize {
        self.sched.lock().queue.len()
    }

    fn report_miss(&self, wid: WorkloadId, miss_ns: u64, now: Time) {
        if self.limiter.allow(now) {
            let event = DeadlineEvent {
                workload_id: wid,
                miss_ns,
                timestamp: now,
            };
            if self.events.offer(event) {
                self.stats.record_miss(miss_ns);
            } else {
                self.stats.incr_rate_limited_drops();
            }
        } else {
            self.stats.incr_rate_limited_drops();
        }
    }
}
