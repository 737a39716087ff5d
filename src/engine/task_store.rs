//! Per-task scheduling contexts.

use crate::types::{TaskId, Time, MAX_TASKS};
use std::collections::HashMap;

/// Scheduling state for one tracked task.
///
/// `deadline` and `start_time` are deliberately independent fields: miss
/// detection consults the absolute deadline stored at enqueue, never the
/// task's runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCtx {
    /// Absolute timestamp by which the task must complete to be on-time.
    pub deadline: Time,
    /// When the task last entered Running; [`Time::ZERO`] means not running.
    pub start_time: Time,
    /// The un-weighted budget attributed at last enqueue, for observability.
    pub budget_ns: u64,
    /// True iff initialized by an enqueue since the last cleanup.
    pub valid: bool,
}

/// A bounded mapping from task id to scheduling context.
///
/// When full, `get_or_create` refuses and the caller takes the fallback
/// enqueue path; tasks are never silently dropped.
#[derive(Debug)]
pub struct TaskCtxStore {
    entries: HashMap<TaskId, TaskCtx>,
    capacity: usize,
}

impl Default for TaskCtxStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskCtxStore {
    /// Creates a store with the authoritative [`MAX_TASKS`] capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MAX_TASKS)
    }

    /// Creates a store with an explicit capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
        }
    }

    /// Returns the existing context for `tid`, or a fresh zeroed one.
    ///
    /// Returns `None` only when the store is at capacity and `tid` is new.
    pub fn get_or_create(&mut self, tid: TaskId) -> Option<&mut TaskCtx> {
        if !self.entries.contains_key(&tid) && self.entries.len() >= self.capacity {
            return None;
        }
        Some(self.entries.entry(tid).or_default())
    }

    /// Returns the context for `tid` without creating one.
    pub fn get(&mut self, tid: TaskId) -> Option<&mut TaskCtx> {
        self.entries.get_mut(&tid)
    }

    /// Removes the context for `tid`. Idempotent.
    pub fn remove(&mut self, tid: TaskId) {
        self.entries.remove(&tid);
    }

    /// Number of tracked tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no tasks are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every tracked context.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
