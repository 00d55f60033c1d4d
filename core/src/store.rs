use anyhow::Result;
use time::OffsetDateTime;

use crate::Sample;

/// Rows written and rows pruned by one committed round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundCommit {
    pub inserted: usize,
    pub pruned: usize,
}

/// The operations the engine needs from sample history. The table is insert-and-delete
/// only; nothing here updates a row in place.
pub trait SampleStore: Send + Sync {
    /// Insert all rows or none of them.
    fn insert_many(&self, samples: &[Sample]) -> Result<usize>;

    fn distinct_targets(&self) -> Result<Vec<String>>;

    fn latest_observed_at(&self, target: &str) -> Result<Option<OffsetDateTime>>;

    fn delete_older_than(&self, cutoff: OffsetDateTime) -> Result<usize>;

    /// Persist one round and prune anything older than `cutoff`. Stores that can do both
    /// in a single transaction should override this.
    fn commit_round(&self, samples: &[Sample], cutoff: OffsetDateTime) -> Result<RoundCommit> {
        let inserted = self.insert_many(samples)?;
        let pruned = self.delete_older_than(cutoff)?;
        Ok(RoundCommit { inserted, pruned })
    }
}

impl<S: SampleStore + ?Sized> SampleStore for std::sync::Arc<S> {
    fn insert_many(&self, samples: &[Sample]) -> Result<usize> { (**self).insert_many(samples) }
    fn distinct_targets(&self) -> Result<Vec<String>> { (**self).distinct_targets() }
    fn latest_observed_at(&self, target: &str) -> Result<Option<OffsetDateTime>> { (**self).latest_observed_at(target) }
    fn delete_older_than(&self, cutoff: OffsetDateTime) -> Result<usize> { (**self).delete_older_than(cutoff) }
    fn commit_round(&self, samples: &[Sample], cutoff: OffsetDateTime) -> Result<RoundCommit> {
        (**self).commit_round(samples, cutoff)
    }
}
