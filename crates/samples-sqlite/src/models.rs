use anyhow::Result;
use domainwatch_core::Sample;
use rusqlite::Row;
use serde::Serialize;
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize)]
pub struct StoredSample {
    pub sample_id: i64,
    #[serde(flatten)]
    pub sample: Sample,
}

pub(crate) const SAMPLE_COLUMNS: &str =
    "sample_id, target, reachable, tls_valid, tls_days_remaining, tls_expires_at, observed_at";

pub(crate) fn to_ms(t: OffsetDateTime) -> i64 {
    (t.unix_timestamp_nanos() / 1_000_000) as i64
}

pub(crate) fn from_ms(ms: i64) -> Result<OffsetDateTime> {
    Ok(OffsetDateTime::from_unix_timestamp_nanos(ms as i128 * 1_000_000)?)
}

fn conversion_err(idx: usize, e: anyhow::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Integer, e.into())
}

/// Map a row selected with [`SAMPLE_COLUMNS`].
pub(crate) fn stored_sample(row: &Row<'_>) -> rusqlite::Result<StoredSample> {
    let expires: Option<i64> = row.get(5)?;
    let observed: i64 = row.get(6)?;
    Ok(StoredSample {
        sample_id: row.get(0)?,
        sample: Sample {
            target: row.get(1)?,
            reachable: row.get(2)?,
            tls_valid: row.get(3)?,
            tls_days_remaining: row.get(4)?,
            tls_expires_at: expires.map(from_ms).transpose().map_err(|e| conversion_err(5, e))?,
            observed_at: from_ms(observed).map_err(|e| conversion_err(6, e))?,
        },
    })
}
