//! Stepped schema migrations keyed on `PRAGMA user_version`
//!
//! Each migration moves the database forward by exactly one version. A fresh
//! database walks the whole list inside the same process, so opening a
//! database is always an upgrade to the latest version.

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::info;

/// Schema version the code expects
pub const CURRENT_VERSION: i64 = 2;

/// SQL applied per version step, index 0 taking the database from 0 to 1
const MIGRATIONS: &[&str] = &[
    include_str!("schema.sql"),
    // v2: dashboard queries filter by kind and status within an installation
    "CREATE INDEX IF NOT EXISTS idx_records_kind_status
       ON mirrored_records (installation_id, kind, status)",
];

/// Read the current schema version
pub fn schema_version(conn: &Connection) -> Result<i64> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .context("Failed to read schema version")
}

/// Apply any pending migrations, returning the number applied
pub fn run_migrations(conn: &Connection) -> Result<usize> {
    let mut version = schema_version(conn)?;
    if version > CURRENT_VERSION {
        anyhow::bail!(
            "Database schema version {} is newer than supported version {}",
            version,
            CURRENT_VERSION
        );
    }

    let mut applied = 0;
    while version < CURRENT_VERSION {
        let sql = MIGRATIONS[version as usize];
        conn.execute_batch(sql)
            .with_context(|| format!("Migration to version {} failed", version + 1))?;
        version += 1;
        conn.pragma_update(None, "user_version", version)
            .context("Failed to record schema version")?;
        applied += 1;
        info!("Applied schema migration to version {}", version);
    }

    Ok(applied)
}
