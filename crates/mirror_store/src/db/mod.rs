//! SQLite database backend for the local mirror
//!
//! One database holds every installation's mirrored rows. WAL journaling keeps
//! concurrent runs for different installations from blocking each other.

pub mod migration;

use anyhow::{Context, Result};
use mirror_common::Installation;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite database manager
pub struct Db {
    pub(crate) conn: Connection,
}

impl Db {
    /// Open or create the mirror database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {:?}", path))?;
        Self::initialize(conn, &format!("{:?}", path))
    }

    /// In-memory database for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::initialize(conn, "<memory>")
    }

    fn initialize(conn: Connection, label: &str) -> Result<Self> {
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        // WAL lets readers proceed while a sync run is writing
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("Failed to enable WAL journaling")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        migration::run_migrations(&conn)?;

        tracing::info!("Mirror database opened at {}", label);
        Ok(Self { conn })
    }

    /// Insert a new installation or refresh tokens/domain on an existing one
    pub fn upsert_installation(&self, installation: &Installation) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        self.conn.execute(
            "INSERT INTO installations
                 (remote_installation_id, shop_domain, active,
                  company_token, integration_token, webhook_token,
                  created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             ON CONFLICT(remote_installation_id) DO UPDATE SET
                 shop_domain = excluded.shop_domain,
                 active = excluded.active,
                 company_token = excluded.company_token,
                 integration_token = excluded.integration_token,
                 webhook_token = excluded.webhook_token,
                 updated_at = excluded.updated_at",
            params![
                installation.remote_installation_id,
                installation.shop_domain,
                installation.active,
                installation.company_token,
                installation.integration_token,
                installation.webhook_token,
                now,
            ],
        )?;

        Ok(())
    }

    /// Look up an installation by its remote identifier
    pub fn get_installation(&self, remote_id: &str) -> Result<Option<Installation>> {
        self.conn
            .query_row(
                "SELECT remote_installation_id, shop_domain, active,
                        company_token, integration_token, webhook_token,
                        created_at, updated_at
                 FROM installations
                 WHERE remote_installation_id = ?1",
                [remote_id],
                Self::map_installation,
            )
            .optional()
            .context("Failed to query installation")
    }

    /// All installations, newest first
    pub fn list_installations(&self) -> Result<Vec<Installation>> {
        let mut stmt = self.conn.prepare(
            "SELECT remote_installation_id, shop_domain, active,
                    company_token, integration_token, webhook_token,
                    created_at, updated_at
             FROM installations
             ORDER BY created_at DESC",
        )?;

        let installations = stmt
            .query_map([], Self::map_installation)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(installations)
    }

    /// Activate or deactivate an installation, returning whether it existed
    pub fn set_installation_active(&self, remote_id: &str, active: bool) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();
        let changed = self.conn.execute(
            "UPDATE installations SET active = ?1, updated_at = ?2
             WHERE remote_installation_id = ?3",
            params![active, now, remote_id],
        )?;
        Ok(changed > 0)
    }

    fn map_installation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Installation> {
        Ok(Installation {
            remote_installation_id: row.get(0)?,
            shop_domain: row.get(1)?,
            active: row.get(2)?,
            company_token: row.get(3)?,
            integration_token: row.get(4)?,
            webhook_token: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    /// Aggregate counts for the status command
    pub fn stats(&self) -> Result<DbStats> {
        let installation_count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM installations", [], |row| row.get(0))?;

        let product_count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM mirrored_records WHERE kind = 'products'",
            [],
            |row| row.get(0),
        )?;

        let order_count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM mirrored_records WHERE kind = 'orders'",
            [],
            |row| row.get(0),
        )?;

        Ok(DbStats {
            installation_count: installation_count as usize,
            product_count: product_count as usize,
            order_count: order_count as usize,
        })
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DbStats {
    pub installation_count: usize,
    pub product_count: usize,
    pub order_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_installation(id: &str) -> Installation {
        Installation {
            remote_installation_id: id.to_string(),
            shop_domain: Some("acme".to_string()),
            active: true,
            company_token: Some("cdrtkn_company00".to_string()),
            integration_token: Some("dit_integration00".to_string()),
            webhook_token: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_db_creation() {
        let db = Db::open_in_memory().unwrap();
        let stats = db.stats().unwrap();

        assert_eq!(stats.installation_count, 0);
        assert_eq!(stats.product_count, 0);
        assert_eq!(stats.order_count, 0);
    }

    #[test]
    fn test_open_on_disk() {
        let temp = assert_fs::TempDir::new().unwrap();
        let db = Db::open(&temp.path().join("mirror.db")).unwrap();
        assert_eq!(db.stats().unwrap().installation_count, 0);
    }

    #[test]
    fn test_installation_roundtrip() {
        let db = Db::open_in_memory().unwrap();
        db.upsert_installation(&sample_installation("inst-1")).unwrap();

        let loaded = db.get_installation("inst-1").unwrap().unwrap();
        assert_eq!(loaded.shop_domain.as_deref(), Some("acme"));
        assert!(loaded.active);
        assert!(loaded.created_at > 0);

        assert!(db.get_installation("missing").unwrap().is_none());
    }

    #[test]
    fn test_installation_upsert_refreshes_tokens() {
        let db = Db::open_in_memory().unwrap();
        db.upsert_installation(&sample_installation("inst-1")).unwrap();

        let mut updated = sample_installation("inst-1");
        updated.company_token = Some("cdrtkn_rotated00".to_string());
        db.upsert_installation(&updated).unwrap();

        let loaded = db.get_installation("inst-1").unwrap().unwrap();
        assert_eq!(loaded.company_token.as_deref(), Some("cdrtkn_rotated00"));
        assert_eq!(db.list_installations().unwrap().len(), 1);
    }

    #[test]
    fn test_set_active() {
        let db = Db::open_in_memory().unwrap();
        db.upsert_installation(&sample_installation("inst-1")).unwrap();

        assert!(db.set_installation_active("inst-1", false).unwrap());
        assert!(!db.get_installation("inst-1").unwrap().unwrap().active);

        assert!(!db.set_installation_active("missing", false).unwrap());
    }
}
