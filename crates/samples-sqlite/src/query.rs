use crate::models::{stored_sample, StoredSample, SAMPLE_COLUMNS};
use crate::Db;
use anyhow::Result;
use rusqlite::{params, Connection};

pub(crate) fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let cnt: i64 = conn.query_row(
        "SELECT COUNT(1) FROM sqlite_master WHERE type='table' AND name=?",
        [name],
        |r| r.get(0),
    )?;
    Ok(cnt > 0)
}

impl Db {
    /// Most recent sample of every stored target, gap rows included.
    pub fn latest_per_target(&self) -> Result<Vec<StoredSample>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {SAMPLE_COLUMNS} FROM (
               SELECT *, ROW_NUMBER() OVER (PARTITION BY target ORDER BY observed_at DESC, sample_id DESC) AS rn
               FROM samples
             ) WHERE rn = 1 ORDER BY target"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], stored_sample)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Samples for one target, newest first.
    pub fn history(&self, target: &str, limit: u32) -> Result<Vec<StoredSample>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {SAMPLE_COLUMNS} FROM samples WHERE target=? ORDER BY observed_at DESC, sample_id DESC LIMIT ?"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![target, limit], stored_sample)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn sample_count(&self) -> Result<i64> {
        let conn = self.lock()?;
        Ok(conn.query_row("SELECT COUNT(1) FROM samples", [], |r| r.get(0))?)
    }
}
