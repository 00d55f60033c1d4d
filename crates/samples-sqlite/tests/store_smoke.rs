use domainwatch_core::{CheckResult, Sample, SampleStore, TlsVerdict};
use samples_sqlite::{export_samples_to_parquet, Db};
use tempfile::tempdir;
use time::macros::datetime;
use time::Duration;

fn real(target: &str, at: time::OffsetDateTime) -> Sample {
    Sample::from(&CheckResult {
        target: target.into(),
        reachable: true,
        tls: TlsVerdict { valid: true, days_remaining: 30, expires_at: Some(at + Duration::days(30)) },
        observed_at: at,
    })
}

#[test]
fn reopen_keeps_history() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("samples.db");
    let at = datetime!(2024-03-01 10:15 UTC);
    {
        let db = Db::open_or_create(&path)?;
        db.insert_many(&[real("example.com", at)])?;
    }
    let db = Db::open_or_create(&path)?;
    assert_eq!(db.sample_count()?, 1);
    assert_eq!(db.latest_observed_at("example.com")?, Some(at));
    Ok(())
}

#[test]
fn round_is_atomic() -> anyhow::Result<()> {
    let db = Db::open_in_memory()?;
    let at = datetime!(2024-03-01 10:15 UTC);
    // an empty target violates the schema, so the whole round must roll back
    let round = vec![real("a.example.com", at), real("b.example.com", at), real("", at)];
    assert!(db.commit_round(&round, at - Duration::hours(168)).is_err());
    assert_eq!(db.sample_count()?, 0);
    assert!(db.insert_many(&round).is_err());
    assert_eq!(db.sample_count()?, 0);
    Ok(())
}

#[test]
fn failed_round_does_not_prune() -> anyhow::Result<()> {
    let db = Db::open_in_memory()?;
    let now = datetime!(2024-03-08 10:15 UTC);
    db.insert_many(&[real("old.example.com", now - Duration::hours(200))])?;
    assert!(db.commit_round(&[real("", now)], now - Duration::hours(168)).is_err());
    assert_eq!(db.sample_count()?, 1);
    Ok(())
}

#[test]
fn commit_round_prunes_expired_rows() -> anyhow::Result<()> {
    let db = Db::open_in_memory()?;
    let now = datetime!(2024-03-08 10:15 UTC);
    db.insert_many(&[
        real("example.com", now - Duration::hours(169)),
        real("example.com", now - Duration::hours(168)),
        Sample::gap("example.com", now - Duration::hours(2)),
    ])?;
    let commit = db.commit_round(&[real("example.com", now)], now - Duration::hours(168))?;
    assert_eq!(commit.inserted, 1);
    assert_eq!(commit.pruned, 1);
    let history = db.history("example.com", 3000)?;
    assert_eq!(history.len(), 3);
    assert!(history.iter().all(|s| s.sample.observed_at >= now - Duration::hours(168)));
    Ok(())
}

#[test]
fn empty_round_still_prunes() -> anyhow::Result<()> {
    let db = Db::open_in_memory()?;
    let now = datetime!(2024-03-08 10:15 UTC);
    db.insert_many(&[real("example.com", now - Duration::days(8))])?;
    let commit = db.commit_round(&[], now - Duration::hours(168))?;
    assert_eq!(commit, domainwatch_core::RoundCommit { inserted: 0, pruned: 1 });
    Ok(())
}

#[test]
fn gap_rows_read_back_as_nulls() -> anyhow::Result<()> {
    let db = Db::open_in_memory()?;
    let at = datetime!(2024-03-01 10:30 UTC);
    db.insert_many(&[Sample::gap("wss://chat.example.com", at)])?;
    let latest = db.latest_per_target()?;
    assert_eq!(latest.len(), 1);
    assert!(latest[0].sample.is_gap());
    assert_eq!(latest[0].sample.tls_days_remaining, None);
    assert_eq!(latest[0].sample.observed_at, at);
    Ok(())
}

#[test]
fn distinct_and_latest_queries() -> anyhow::Result<()> {
    let db = Db::open_in_memory()?;
    let t0 = datetime!(2024-03-01 10:00 UTC);
    db.insert_many(&[
        real("b.example.com", t0),
        real("a.example.com", t0),
        real("a.example.com", t0 + Duration::minutes(15)),
    ])?;
    assert_eq!(db.distinct_targets()?, vec!["a.example.com".to_string(), "b.example.com".to_string()]);
    assert_eq!(db.latest_observed_at("a.example.com")?, Some(t0 + Duration::minutes(15)));
    assert_eq!(db.latest_observed_at("missing.example.com")?, None);

    let latest = db.latest_per_target()?;
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[0].sample.target, "a.example.com");
    assert_eq!(latest[0].sample.observed_at, t0 + Duration::minutes(15));

    let history = db.history("a.example.com", 1)?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].sample.observed_at, t0 + Duration::minutes(15));
    Ok(())
}

#[test]
fn negative_days_are_stored_unclamped() -> anyhow::Result<()> {
    let db = Db::open_in_memory()?;
    let at = datetime!(2024-03-01 10:00 UTC);
    let expired = Sample::from(&CheckResult {
        target: "wss://chat.example.com".into(),
        reachable: true,
        tls: TlsVerdict { valid: false, days_remaining: -2, expires_at: Some(at - Duration::days(2)) },
        observed_at: at,
    });
    db.insert_many(&[expired.clone()])?;
    let back = db.history("wss://chat.example.com", 10)?;
    assert_eq!(back[0].sample, expired);
    Ok(())
}

#[test]
fn export_writes_every_row() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let db = Db::open_in_memory()?;
    let at = datetime!(2024-03-01 10:00 UTC);
    db.insert_many(&[real("example.com", at), Sample::gap("example.com", at + Duration::minutes(15))])?;
    let out = dir.path().join("samples.parquet");
    assert_eq!(export_samples_to_parquet(&db, &out)?, 2);
    assert!(std::fs::metadata(&out)?.len() > 0);
    Ok(())
}
