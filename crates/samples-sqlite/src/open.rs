use crate::query::table_exists;
use crate::schema::MIG_0001_INIT;
use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};

/// Handle to the sample history database. Cheap to share behind an `Arc`; every
/// operation takes the connection lock for its duration.
pub struct Db {
    conn: Mutex<Connection>,
}

impl Db {
    pub fn open_or_create(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).with_context(|| format!("failed to open sqlite db at {}", path.display()))?;
        apply_pragmas(&conn)?;
        migrate(&conn)?;
        tracing::debug!(path = %path.display(), "sample store ready");
        Ok(Db { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory sqlite db")?;
        migrate(&conn)?;
        Ok(Db { conn: Mutex::new(conn) })
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow!("sample store lock poisoned"))
    }
}

fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "busy_timeout", 5000i64)?;
    Ok(())
}

fn migrate(conn: &Connection) -> Result<()> {
    if !table_exists(conn, "samples")? {
        conn.execute_batch(MIG_0001_INIT).context("failed to apply initial schema")?;
    }
    Ok(())
}
