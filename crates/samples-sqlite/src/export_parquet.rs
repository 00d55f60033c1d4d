use anyhow::{Context, Result};
use arrow::array::{ArrayRef, BooleanBuilder, Int64Builder, StringBuilder};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rusqlite::Row;
use std::sync::Arc;

use crate::{arrow_schemas, Db};

const CHUNK: usize = 10_000;

/// Write the whole sample table to `out`. Null measurement columns survive the export so
/// gap rows remain distinguishable from failed probes. Returns the number of rows written.
pub fn export_samples_to_parquet(db: &Db, out: &std::path::Path) -> Result<usize> {
    let conn = db.lock()?;
    let mut stmt = conn.prepare(
        "SELECT sample_id, target, reachable, tls_valid, tls_days_remaining, tls_expires_at, observed_at
         FROM samples ORDER BY target, observed_at",
    )?;
    let mut rows = stmt.query([])?;
    let file = std::fs::File::create(out).with_context(|| format!("failed to create {}", out.display()))?;
    let schema = Arc::new(arrow_schemas::samples_schema());

    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(Default::default()))
        .build();

    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;
    let mut total = 0usize;

    loop {
        let mut batch = SampleBatch::default();
        let mut count = 0;
        while count < CHUNK {
            let Some(row) = rows.next()? else { break; };
            batch.push(row)?;
            count += 1;
        }
        if count == 0 { break; }
        let rb = RecordBatch::try_new(schema.clone(), batch.finish())?;
        writer.write(&rb)?;
        total += count;
    }

    writer.close()?;
    tracing::info!(rows = total, path = %out.display(), "exported samples");
    Ok(total)
}

#[derive(Default)]
struct SampleBatch {
    sample_id: Int64Builder,
    target: StringBuilder,
    reachable: BooleanBuilder,
    tls_valid: BooleanBuilder,
    days_remaining: Int64Builder,
    expires_at: Int64Builder,
    observed_at: Int64Builder,
}

impl SampleBatch {
    fn push(&mut self, row: &Row<'_>) -> Result<()> {
        self.sample_id.append_value(row.get::<_, i64>(0)?);
        self.target.append_value(row.get::<_, String>(1)?);
        self.reachable.append_option(row.get::<_, Option<bool>>(2)?);
        self.tls_valid.append_option(row.get::<_, Option<bool>>(3)?);
        self.days_remaining.append_option(row.get::<_, Option<i64>>(4)?);
        self.expires_at.append_option(row.get::<_, Option<i64>>(5)?);
        self.observed_at.append_value(row.get::<_, i64>(6)?);
        Ok(())
    }

    fn finish(mut self) -> Vec<ArrayRef> {
        vec![
            Arc::new(self.sample_id.finish()),
            Arc::new(self.target.finish()),
            Arc::new(self.reachable.finish()),
            Arc::new(self.tls_valid.finish()),
            Arc::new(self.days_remaining.finish()),
            Arc::new(self.expires_at.finish()),
            Arc::new(self.observed_at.finish()),
        ]
    }
}
