//! Bounded workload config storage.

use crate::config::validate::{validate, ConfigError};
use crate::types::{SloCfg, WorkloadId, DEFAULT_BUDGET_NS, MAX_WORKLOADS};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, warn};

/// A bounded mapping from workload id to validated configuration.
///
/// Capacity is a hard limit: a full store rejects new workloads instead of
/// evicting old ones, so the engine never silently forgets configuration.
/// Readers observe either the pre-update or the post-update record of a
/// concurrent upsert, never a torn mix.
#[derive(Debug)]
pub struct ConfigStore {
    entries: RwLock<HashMap<WorkloadId, SloCfg>>,
    capacity: usize,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    /// Creates a store with the authoritative [`MAX_WORKLOADS`] capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MAX_WORKLOADS)
    }

    /// Creates a store with an explicit capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Validates `cfg` and stores or atomically replaces the entry for `wid`.
    ///
    /// Overwriting an existing workload never consumes a new slot, so
    /// updates keep working at capacity.
    pub fn upsert(&self, wid: WorkloadId, cfg: SloCfg) -> Result<(), ConfigError> {
        if let Err(reason) = validate(&cfg) {
            warn!(%wid, %reason, "rejected workload config");
            return Err(reason);
        }

        let mut entries = self.entries.write();
        if !entries.contains_key(&wid) && entries.len() >= self.capacity {
            drop(entries);
            warn!(%wid, capacity = self.capacity, "workload config store full");
            return Err(ConfigError::CapacityExhausted);
        }
        let replaced = entries.insert(wid, cfg).is_some();
        drop(entries);

        debug!(
            %wid,
            budget_ns = cfg.budget_ns,
            importance = cfg.importance,
            replaced,
            "stored workload config"
        );
        Ok(())
    }

    /// Removes the entry for `wid`. Returns true iff an entry existed.
    pub fn remove(&self, wid: WorkloadId) -> bool {
        let removed = self.entries.write().remove(&wid).is_some();
        if removed {
            debug!(%wid, "removed workload config");
        }
        removed
    }

    /// Returns the validated configuration for `wid`.
    ///
    /// Fails closed: a stored record that no longer passes validation is
    /// treated as absent.
    #[must_use]
    pub fn get(&self, wid: WorkloadId) -> Option<SloCfg> {
        let cfg = self.entries.read().get(&wid).copied()?;
        validate(&cfg).ok()?;
        Some(cfg)
    }

    /// Returns the workload's validated budget, or [`DEFAULT_BUDGET_NS`].
    ///
    /// Every hot-path deadline computation goes through here, so a corrupted
    /// store degrades to default scheduling rather than an escalation.
    #[must_use]
    pub fn safe_budget(&self, wid: WorkloadId) -> u64 {
        self.get(wid).map_or(DEFAULT_BUDGET_NS, |cfg| cfg.budget_ns)
    }

    /// Number of stored workloads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if no workloads are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
