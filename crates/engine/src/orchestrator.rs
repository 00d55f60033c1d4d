use domainwatch_core::quantum::retention_cutoff;
use domainwatch_core::{Sample, SampleStore};
use probe::{ProbeError, Prober};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use targets::TargetRegistry;
use time::OffsetDateTime;
use tracing::Instrument;
use uuid::Uuid;

use crate::EngineSettings;

#[derive(Debug, Clone)]
pub struct RoundReport {
    pub round_id: Uuid,
    pub targets: usize,
    pub reachable: usize,
    pub inserted: usize,
    pub pruned: usize,
    pub elapsed: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum RoundError {
    #[error("round {round_id} discarded, nothing persisted: {source}")]
    Persist {
        round_id: Uuid,
        #[source]
        source: anyhow::Error,
    },
}

/// Runs one round: probe every registered target, persist all results atomically, prune
/// rows past retention.
pub struct Orchestrator<S> {
    registry: TargetRegistry,
    prober: Prober,
    store: S,
    settings: EngineSettings,
}

impl<S: SampleStore> Orchestrator<S> {
    pub fn new(registry: TargetRegistry, store: S, settings: EngineSettings) -> Result<Self, ProbeError> {
        let prober = Prober::new(settings.probe_timeout)?;
        Ok(Orchestrator { registry, prober, store, settings })
    }

    pub fn store(&self) -> &S { &self.store }

    pub async fn run_round(&self) -> Result<RoundReport, RoundError> {
        let round_id = Uuid::now_v7();
        self.run_round_inner(round_id).instrument(tracing::info_span!("round", %round_id)).await
    }

    async fn run_round_inner(&self, round_id: Uuid) -> Result<RoundReport, RoundError> {
        let started = Instant::now();
        let identifiers = unique_identifiers(&self.registry);
        tracing::info!(targets = identifiers.len(), "round started");

        let results = self.prober.probe_all(identifiers, self.settings.concurrency).await;
        let reachable = results.iter().filter(|r| r.reachable).count();
        let samples: Vec<Sample> = results.iter().map(Sample::from).collect();

        let cutoff = retention_cutoff(OffsetDateTime::now_utc(), self.settings.retention);
        let commit = self
            .store
            .commit_round(&samples, cutoff)
            .map_err(|source| RoundError::Persist { round_id, source })?;

        let report = RoundReport {
            round_id,
            targets: results.len(),
            reachable,
            inserted: commit.inserted,
            pruned: commit.pruned,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            targets = report.targets,
            reachable = report.reachable,
            inserted = report.inserted,
            pruned = report.pruned,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "round committed"
        );
        Ok(report)
    }
}

/// Registry identifiers in file order, first occurrence wins.
fn unique_identifiers(registry: &TargetRegistry) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for id in registry.identifiers() {
        if seen.insert(id.clone()) {
            out.push(id);
        } else {
            tracing::warn!(target_id = %id, "duplicate target ignored for this round");
        }
    }
    out
}
