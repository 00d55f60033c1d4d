//! The monitoring engine: one round of probes, startup gap repair, and the
//! quarter-hour schedule that drives rounds forever.

pub mod backfill;
pub mod orchestrator;
pub mod scheduler;

use domainwatch_core::quantum::{PROBE_TIMEOUT, RETENTION};

pub use backfill::{backfill, BackfillError, BackfillReport};
pub use orchestrator::{Orchestrator, RoundError, RoundReport};
pub use scheduler::{Scheduler, SchedulerState};

pub const DEFAULT_CONCURRENCY: usize = 64;

/// Fixed for the engine's lifetime once constructed.
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub probe_timeout: std::time::Duration,
    pub retention: time::Duration,
    pub concurrency: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings { probe_timeout: PROBE_TIMEOUT, retention: RETENTION, concurrency: DEFAULT_CONCURRENCY }
    }
}
