#![allow(dead_code)]
//! Shared integration test utilities.

use slosched::{Clock, ManualClock, SloEngine, TaskId, Time, WorkloadId};
use std::sync::{Arc, Once};

static INIT_LOGGING: Once = Once::new();

/// Initialize test logging once; later calls are no-ops.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .with_test_writer()
            .with_ansi(false)
            .try_init();
    });
}

/// An engine driven by a hand-advanced clock starting at `start_ns`.
pub fn engine_at(start_ns: u64) -> (Arc<ManualClock>, SloEngine) {
    let clock = Arc::new(ManualClock::new(Time::from_nanos(start_ns)));
    let engine = SloEngine::new(Arc::clone(&clock) as Arc<dyn Clock>);
    (clock, engine)
}

pub fn tid(raw: u32) -> TaskId {
    TaskId::new(raw)
}

pub fn wid(raw: u64) -> WorkloadId {
    WorkloadId::new(raw)
}
