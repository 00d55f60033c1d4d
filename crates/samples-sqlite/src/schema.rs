// Timestamps are unix milliseconds, UTC.
pub const MIG_0001_INIT: &str = r#"
BEGIN;

CREATE TABLE samples (
  sample_id           INTEGER PRIMARY KEY AUTOINCREMENT,
  target              TEXT NOT NULL CHECK (length(target) > 0),
  reachable           INTEGER CHECK (reachable IN (0,1)),
  tls_valid           INTEGER CHECK (tls_valid IN (0,1)),
  tls_days_remaining  INTEGER,
  tls_expires_at      INTEGER,
  observed_at         INTEGER NOT NULL DEFAULT (CAST(strftime('%s','now') AS INTEGER) * 1000)
);

CREATE INDEX idx_samples_target_observed ON samples(target, observed_at);
CREATE INDEX idx_samples_observed ON samples(observed_at);

COMMIT;
"#
;
