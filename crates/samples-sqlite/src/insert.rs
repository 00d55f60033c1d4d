use crate::models::to_ms;
use crate::Db;
use anyhow::{Context, Result};
use domainwatch_core::{RoundCommit, Sample, SampleStore};
use rusqlite::{params, Transaction};
use time::OffsetDateTime;

const INSERT_SAMPLE: &str = "INSERT INTO samples(target,reachable,tls_valid,tls_days_remaining,tls_expires_at,observed_at) VALUES (?,?,?,?,?,?)";

fn insert_rows(tx: &Transaction<'_>, samples: &[Sample]) -> Result<usize> {
    let mut stmt = tx.prepare_cached(INSERT_SAMPLE)?;
    for s in samples {
        stmt.execute(params![
            s.target,
            s.reachable,
            s.tls_valid,
            s.tls_days_remaining,
            s.tls_expires_at.map(to_ms),
            to_ms(s.observed_at),
        ])
        .with_context(|| format!("failed to insert sample for {}", s.target))?;
    }
    Ok(samples.len())
}

fn delete_before(tx: &Transaction<'_>, cutoff: OffsetDateTime) -> Result<usize> {
    Ok(tx.execute("DELETE FROM samples WHERE observed_at < ?", params![to_ms(cutoff)])?)
}

impl SampleStore for Db {
    fn insert_many(&self, samples: &[Sample]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let n = insert_rows(&tx, samples)?;
        tx.commit()?;
        Ok(n)
    }

    fn distinct_targets(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT DISTINCT target FROM samples ORDER BY target")?;
        let rows = stmt.query_map([], |r| r.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
    }

    fn latest_observed_at(&self, target: &str) -> Result<Option<OffsetDateTime>> {
        let conn = self.lock()?;
        let ms: Option<i64> = conn.query_row(
            "SELECT MAX(observed_at) FROM samples WHERE target=?",
            [target],
            |r| r.get(0),
        )?;
        ms.map(crate::models::from_ms).transpose()
    }

    fn delete_older_than(&self, cutoff: OffsetDateTime) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let n = delete_before(&tx, cutoff)?;
        tx.commit()?;
        Ok(n)
    }

    /// Inserts and prunes in one transaction: a failed insert leaves neither the new rows
    /// nor the deletion visible.
    fn commit_round(&self, samples: &[Sample], cutoff: OffsetDateTime) -> Result<RoundCommit> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let inserted = insert_rows(&tx, samples)?;
        let pruned = delete_before(&tx, cutoff)?;
        tx.commit()?;
        Ok(RoundCommit { inserted, pruned })
    }
}
