//! Core types for the scheduling engine.
//!
//! - [`id`]: identifier and time types (`WorkloadId`, `TaskId`, `Time`)
//! - [`cfg`]: per-workload SLO configuration and the authoritative bounds

pub mod cfg;
pub mod id;

pub use self::cfg::{
    SloCfg, DEFAULT_BUDGET_NS, DEFAULT_IMPORTANCE, MAX_BUDGET_NS, MAX_IMPORTANCE, MAX_TASKS,
    MAX_WORKLOADS, MIN_BUDGET_NS, MIN_IMPORTANCE,
};
pub use self::id::{TaskId, Time, WorkloadId};
