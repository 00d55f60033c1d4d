use domainwatch_core::quantum::missing_slots;
use domainwatch_core::{Sample, SampleStore};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub targets: usize,
    pub inserted: usize,
    pub failed: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum BackfillError {
    #[error("cannot list stored targets: {0}")]
    ListTargets(#[source] anyhow::Error),
}

/// Insert a gap row on every quarter-hour boundary between each target's last sample and
/// the boundary `now` falls in. Targets without history are left alone. A failure on one
/// target is logged and does not stop the others.
pub fn backfill<S: SampleStore + ?Sized>(store: &S, now: OffsetDateTime) -> Result<BackfillReport, BackfillError> {
    let targets = store.distinct_targets().map_err(BackfillError::ListTargets)?;
    let mut report = BackfillReport { targets: targets.len(), ..Default::default() };
    for target in &targets {
        match fill_target(store, target, now) {
            Ok(n) => report.inserted += n,
            Err(e) => {
                report.failed += 1;
                tracing::error!(target_id = %target, error = %e, "gap backfill abandoned");
            }
        }
    }
    tracing::info!(targets = report.targets, inserted = report.inserted, failed = report.failed, "gap backfill complete");
    Ok(report)
}

fn fill_target<S: SampleStore + ?Sized>(store: &S, target: &str, now: OffsetDateTime) -> anyhow::Result<usize> {
    let Some(last) = store.latest_observed_at(target)? else { return Ok(0) };
    let slots = missing_slots(last, now);
    let Some(first) = slots.first() else { return Ok(0) };
    tracing::info!(target_id = target, from = %first, count = slots.len(), "backfilling missed checks");
    let rows: Vec<Sample> = slots.iter().map(|at| Sample::gap(target, *at)).collect();
    store.insert_many(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use domainwatch_core::{CheckResult, TlsVerdict};
    use samples_sqlite::Db;
    use time::macros::datetime;
    use time::Duration;

    fn real(target: &str, at: OffsetDateTime) -> Sample {
        Sample::from(&CheckResult { target: target.into(), reachable: true, tls: TlsVerdict::not_applicable(), observed_at: at })
    }

    #[test]
    fn fills_up_to_but_not_including_now() {
        let db = Db::open_in_memory().unwrap();
        let t = datetime!(2024-03-01 10:00 UTC);
        db.insert_many(&[real("example.com", t)]).unwrap();

        let report = backfill(&db, t + Duration::minutes(45) + Duration::seconds(20)).unwrap();
        assert_eq!(report, BackfillReport { targets: 1, inserted: 2, failed: 0 });

        let rows = db.history("example.com", 10).unwrap();
        let gap_times: Vec<_> = rows.iter().filter(|r| r.sample.is_gap()).map(|r| r.sample.observed_at).collect();
        assert_eq!(gap_times, vec![t + Duration::minutes(30), t + Duration::minutes(15)]);
    }

    #[test]
    fn second_run_inserts_nothing() {
        let db = Db::open_in_memory().unwrap();
        let t = datetime!(2024-03-01 10:07:31 UTC);
        db.insert_many(&[real("a.example.com", t), real("b.example.com", t - Duration::hours(5))]).unwrap();
        let now = datetime!(2024-03-01 13:02 UTC);

        let first = backfill(&db, now).unwrap();
        assert!(first.inserted > 0);
        let count = db.sample_count().unwrap();

        let second = backfill(&db, now).unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(db.sample_count().unwrap(), count);
    }

    #[test]
    fn history_has_no_gap_wider_than_a_quantum() {
        let db = Db::open_in_memory().unwrap();
        let t = datetime!(2024-03-01 00:00 UTC);
        db.insert_many(&[real("example.com", t)]).unwrap();
        let now = t + Duration::days(2) + Duration::minutes(3);
        backfill(&db, now).unwrap();
        // the next scheduled round fires on the boundary that was excluded
        db.insert_many(&[real("example.com", t + Duration::days(2))]).unwrap();

        let mut times: Vec<_> = db.history("example.com", 3000).unwrap().into_iter().map(|r| r.sample.observed_at).collect();
        times.reverse();
        assert!(times.windows(2).all(|w| w[1] - w[0] <= Duration::minutes(15)));
    }

    #[test]
    fn empty_store_is_a_no_op() {
        let db = Db::open_in_memory().unwrap();
        assert_eq!(backfill(&db, datetime!(2024-03-01 10:00 UTC)).unwrap(), BackfillReport::default());
    }

    struct FlakyStore {
        inner: Db,
        broken: &'static str,
    }

    impl SampleStore for FlakyStore {
        fn insert_many(&self, samples: &[Sample]) -> anyhow::Result<usize> {
            if samples.iter().any(|s| s.target == self.broken) {
                return Err(anyhow!("disk full"));
            }
            self.inner.insert_many(samples)
        }
        fn distinct_targets(&self) -> anyhow::Result<Vec<String>> { self.inner.distinct_targets() }
        fn latest_observed_at(&self, target: &str) -> anyhow::Result<Option<OffsetDateTime>> { self.inner.latest_observed_at(target) }
        fn delete_older_than(&self, cutoff: OffsetDateTime) -> anyhow::Result<usize> { self.inner.delete_older_than(cutoff) }
    }

    #[test]
    fn failing_target_does_not_block_others() {
        let inner = Db::open_in_memory().unwrap();
        let t = datetime!(2024-03-01 10:00 UTC);
        inner.insert_many(&[real("a.example.com", t), real("b.example.com", t)]).unwrap();
        let store = FlakyStore { inner, broken: "a.example.com" };

        let report = backfill(&store, t + Duration::hours(1)).unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.inserted, 3);
        assert_eq!(store.inner.history("a.example.com", 10).unwrap().len(), 1);
    }
}
