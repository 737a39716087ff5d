//! Per-workload SLO configuration and the authoritative bounds.

use serde::{Deserialize, Serialize};

/// Smallest accepted latency budget: 1 ms.
///
/// A zero or sub-millisecond budget would grant near-infinite priority.
pub const MIN_BUDGET_NS: u64 = 1_000_000;

/// Largest accepted latency budget: 10 s.
pub const MAX_BUDGET_NS: u64 = 10_000_000_000;

/// Budget applied to workloads with no valid configuration: 100 ms.
pub const DEFAULT_BUDGET_NS: u64 = 100_000_000;

/// Lowest importance weight.
pub const MIN_IMPORTANCE: u32 = 1;

/// Highest importance weight.
pub const MAX_IMPORTANCE: u32 = 100;

/// Importance applied to workloads with no valid configuration.
pub const DEFAULT_IMPORTANCE: u32 = 50;

/// Hard capacity of the workload config store.
pub const MAX_WORKLOADS: usize = 10_000;

/// Hard capacity of the task context store.
pub const MAX_TASKS: usize = 100_000;

/// A workload's service-level objective.
///
/// Validated by [`validate`](crate::config::validate()) before it is ever
/// stored; the engine never acts on an out-of-bounds record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SloCfg {
    /// Latency budget in nanoseconds, within
    /// [`MIN_BUDGET_NS`, `MAX_BUDGET_NS`].
    pub budget_ns: u64,
    /// Relative importance in [1, 100]; higher means an earlier deadline
    /// after weighting.
    pub importance: u32,
    /// Reserved, must be zero.
    pub flags: u32,
}

impl SloCfg {
    /// Builds a config with zeroed reserved flags.
    #[must_use]
    pub const fn new(budget_ns: u64, importance: u32) -> Self {
        Self {
            budget_ns,
            importance,
            flags: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_coherent() {
        assert!(MIN_BUDGET_NS <= DEFAULT_BUDGET_NS);
        assert!(DEFAULT_BUDGET_NS <= MAX_BUDGET_NS);
        assert!(MIN_IMPORTANCE <= DEFAULT_IMPORTANCE);
        assert!(DEFAULT_IMPORTANCE <= MAX_IMPORTANCE);
    }

    #[test]
    fn new_zeroes_flags() {
        let cfg = SloCfg::new(DEFAULT_BUDGET_NS, 75);
        assert_eq!(cfg.flags, 0);
        assert_eq!(cfg.budget_ns, DEFAULT_BUDGET_NS);
        assert_eq!(cfg.importance, 75);
    }
}
