use domainwatch_core::quantum::{delay_until, next_fire};
use domainwatch_core::SampleStore;
use time::OffsetDateTime;
use tokio::sync::watch;

use crate::backfill::backfill;
use crate::orchestrator::Orchestrator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

/// Fires a round on every quarter-hour boundary of wall-clock time. The delay is
/// recomputed from the clock after each round, so late starts and long rounds do not
/// shift later ticks. A boundary fires at most once.
pub struct Scheduler<S> {
    orchestrator: Orchestrator<S>,
    state: watch::Sender<SchedulerState>,
}

impl<S: SampleStore> Scheduler<S> {
    pub fn new(orchestrator: Orchestrator<S>) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Scheduler { orchestrator, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Backfill, run one round immediately, then tick forever.
    pub async fn start(&self) {
        if let Err(e) = backfill(self.orchestrator.store(), OffsetDateTime::now_utc()) {
            tracing::error!(error = %e, "gap backfill skipped");
        }
        self.fire().await;
        self.run().await
    }

    pub async fn run(&self) {
        let mut last_fired = None;
        loop {
            let now = OffsetDateTime::now_utc();
            let next = next_fire(last_fired, now);
            let delay = delay_until(next, now);
            tracing::info!(next = %next, delay_secs = delay.as_secs(), "next round scheduled");
            tokio::time::sleep(delay).await;
            last_fired = Some(next);
            self.fire().await;
        }
    }

    async fn fire(&self) {
        self.state.send_replace(SchedulerState::Running);
        if let Err(e) = self.orchestrator.run_round().await {
            tracing::error!(error = %e, "round failed");
        }
        self.state.send_replace(SchedulerState::Idle);
    }
}
