//! Mirrored record storage: batched upsert and dashboard queries
//!
//! The upsert is a single parameterized multi-row statement per batch, keyed
//! on `(installation_id, remote_record_id)`. On conflict every projected field
//! is overwritten except `created_at`; `updated_at` is refreshed. Running the
//! same batch twice therefore leaves the row set unchanged apart from
//! `updated_at`.

use crate::db::Db;
use anyhow::{Context, Result};
use mirror_common::ResourceKind;
use rusqlite::types::Value;
use rusqlite::{params, OptionalExtension};

/// Projection of one remote record, ready for upsert
///
/// Timestamps are owned by the store, not the projection: `created_at` is set
/// once on first insert, `updated_at` on every write.
#[derive(Debug, Clone, PartialEq)]
pub struct MirroredRecord {
    pub installation_id: String,
    pub remote_record_id: String,
    pub kind: ResourceKind,
    pub title: Option<String>,
    pub customer_name: Option<String>,
    pub amount: Option<f64>,
    pub status: Option<String>,
    pub item_count: Option<i64>,
    /// Full original payload, kept for later inspection
    pub payload: String,
}

/// A stored row read back from the mirror
#[derive(Debug, Clone, serde::Serialize)]
pub struct RecordRow {
    pub installation_id: String,
    pub remote_record_id: String,
    pub kind: String,
    pub title: Option<String>,
    pub customer_name: Option<String>,
    pub amount: Option<f64>,
    pub status: Option<String>,
    pub item_count: Option<i64>,
    pub payload: String,
    pub created_at: i64,
    pub updated_at: i64,
}

const UPSERT_COLUMNS: usize = 11;

/// SQLite's default bound-variable cap (SQLITE_MAX_VARIABLE_NUMBER)
const SQLITE_MAX_VARIABLES: usize = 32_766;

/// Rows per multi-row statement that stay under the variable cap
const MAX_ROWS_PER_STATEMENT: usize = SQLITE_MAX_VARIABLES / UPSERT_COLUMNS;

impl Db {
    /// Insert or update a batch of mirrored records
    ///
    /// Returns the number of rows written. Batches larger than the SQLite
    /// bound-variable cap allows in one statement are split across several
    /// statements inside the same transaction, so a failing batch still
    /// leaves no partial rows behind.
    pub fn upsert_records(&mut self, rows: &[MirroredRecord]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let now = chrono::Utc::now().timestamp();

        let tx = self.conn.transaction()?;
        for chunk in rows.chunks(MAX_ROWS_PER_STATEMENT) {
            let placeholders = std::iter::repeat("(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)")
                .take(chunk.len())
                .collect::<Vec<_>>()
                .join(", ");

            let sql = format!(
                "INSERT INTO mirrored_records
                     (installation_id, remote_record_id, kind, title, customer_name,
                      amount, status, item_count, payload, created_at, updated_at)
                 VALUES {}
                 ON CONFLICT(installation_id, remote_record_id) DO UPDATE SET
                     kind = excluded.kind,
                     title = excluded.title,
                     customer_name = excluded.customer_name,
                     amount = excluded.amount,
                     status = excluded.status,
                     item_count = excluded.item_count,
                     payload = excluded.payload,
                     updated_at = excluded.updated_at",
                placeholders
            );

            let mut values: Vec<Value> = Vec::with_capacity(chunk.len() * UPSERT_COLUMNS);
            for row in chunk {
                values.push(Value::from(row.installation_id.clone()));
                values.push(Value::from(row.remote_record_id.clone()));
                values.push(Value::from(row.kind.path().to_string()));
                values.push(Value::from(row.title.clone()));
                values.push(Value::from(row.customer_name.clone()));
                values.push(Value::from(row.amount));
                values.push(Value::from(row.status.clone()));
                values.push(Value::from(row.item_count));
                values.push(Value::from(row.payload.clone()));
                values.push(Value::from(now));
                values.push(Value::from(now));
            }

            tx.execute(&sql, rusqlite::params_from_iter(values))
                .with_context(|| format!("Batch upsert of {} records failed", rows.len()))?;
        }
        tx.commit()?;

        Ok(rows.len())
    }

    /// Fetch one mirrored record by its composite key
    pub fn get_record(
        &self,
        installation_id: &str,
        remote_record_id: &str,
    ) -> Result<Option<RecordRow>> {
        self.conn
            .query_row(
                &format!("{} WHERE installation_id = ?1 AND remote_record_id = ?2", SELECT_RECORD),
                params![installation_id, remote_record_id],
                map_record,
            )
            .optional()
            .context("Failed to query mirrored record")
    }

    /// Count mirrored records for an installation, optionally by kind
    pub fn count_records(
        &self,
        installation_id: &str,
        kind: Option<ResourceKind>,
    ) -> Result<usize> {
        let count: i64 = match kind {
            Some(kind) => self.conn.query_row(
                "SELECT COUNT(*) FROM mirrored_records
                 WHERE installation_id = ?1 AND kind = ?2",
                params![installation_id, kind.path()],
                |row| row.get(0),
            )?,
            None => self.conn.query_row(
                "SELECT COUNT(*) FROM mirrored_records WHERE installation_id = ?1",
                [installation_id],
                |row| row.get(0),
            )?,
        };
        Ok(count as usize)
    }

    /// List mirrored records for dashboards, filtered by kind and status
    pub fn list_records(
        &self,
        installation_id: &str,
        kind: Option<ResourceKind>,
        status: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RecordRow>> {
        let mut sql = format!("{} WHERE installation_id = ?1", SELECT_RECORD);
        let mut values: Vec<Value> = vec![Value::from(installation_id.to_string())];

        if let Some(kind) = kind {
            values.push(Value::from(kind.path().to_string()));
            sql.push_str(&format!(" AND kind = ?{}", values.len()));
        }
        if let Some(status) = status {
            values.push(Value::from(status.to_string()));
            sql.push_str(&format!(" AND status = ?{}", values.len()));
        }

        values.push(Value::from(limit as i64));
        sql.push_str(&format!(" ORDER BY updated_at DESC LIMIT ?{}", values.len()));

        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(rusqlite::params_from_iter(values), map_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }
}

const SELECT_RECORD: &str = "SELECT installation_id, remote_record_id, kind, title, \
     customer_name, amount, status, item_count, payload, created_at, updated_at \
     FROM mirrored_records";

fn map_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecordRow> {
    Ok(RecordRow {
        installation_id: row.get(0)?,
        remote_record_id: row.get(1)?,
        kind: row.get(2)?,
        title: row.get(3)?,
        customer_name: row.get(4)?,
        amount: row.get(5)?,
        status: row.get(6)?,
        item_count: row.get(7)?,
        payload: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(installation: &str, id: &str, status: &str) -> MirroredRecord {
        MirroredRecord {
            installation_id: installation.to_string(),
            remote_record_id: id.to_string(),
            kind: ResourceKind::Orders,
            title: None,
            customer_name: Some("Jo Doe".to_string()),
            amount: Some(42.5),
            status: Some(status.to_string()),
            item_count: Some(2),
            payload: format!(r#"{{"id":"{}"}}"#, id),
        }
    }

    #[test]
    fn test_upsert_and_read_back() {
        let mut db = Db::open_in_memory().unwrap();
        let written = db
            .upsert_records(&[record("inst-1", "100", "paid"), record("inst-1", "101", "open")])
            .unwrap();

        assert_eq!(written, 2);
        let row = db.get_record("inst-1", "100").unwrap().unwrap();
        assert_eq!(row.customer_name.as_deref(), Some("Jo Doe"));
        assert_eq!(row.amount, Some(42.5));
        assert_eq!(row.kind, "orders");
        assert!(row.created_at > 0);
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let mut db = Db::open_in_memory().unwrap();
        assert_eq!(db.upsert_records(&[]).unwrap(), 0);
        assert_eq!(db.count_records("inst-1", None).unwrap(), 0);
    }

    #[test]
    fn test_conflict_updates_in_place() {
        let mut db = Db::open_in_memory().unwrap();
        db.upsert_records(&[record("inst-1", "100", "open")]).unwrap();

        let mut updated = record("inst-1", "100", "paid");
        updated.amount = Some(99.0);
        db.upsert_records(&[updated]).unwrap();

        assert_eq!(db.count_records("inst-1", None).unwrap(), 1);
        let row = db.get_record("inst-1", "100").unwrap().unwrap();
        assert_eq!(row.status.as_deref(), Some("paid"));
        assert_eq!(row.amount, Some(99.0));
    }

    #[test]
    fn test_conflict_preserves_created_at() {
        let mut db = Db::open_in_memory().unwrap();
        db.upsert_records(&[record("inst-1", "100", "open")]).unwrap();
        let before = db.get_record("inst-1", "100").unwrap().unwrap();

        db.upsert_records(&[record("inst-1", "100", "paid")]).unwrap();
        let after = db.get_record("inst-1", "100").unwrap().unwrap();

        assert_eq!(after.created_at, before.created_at);
    }

    #[test]
    fn test_batch_exceeding_variable_cap_is_split() {
        // 3000 rows x 11 columns would need more bound variables than one
        // statement may carry; the upsert must split, not fail
        let mut db = Db::open_in_memory().unwrap();
        let records: Vec<MirroredRecord> =
            (0..3000).map(|i| record("inst-1", &i.to_string(), "paid")).collect();

        let written = db.upsert_records(&records).unwrap();
        assert_eq!(written, 3000);
        assert_eq!(db.count_records("inst-1", None).unwrap(), 3000);

        // Still idempotent across the statement split
        db.upsert_records(&records).unwrap();
        assert_eq!(db.count_records("inst-1", None).unwrap(), 3000);
    }

    #[test]
    fn test_same_remote_id_distinct_installations() {
        let mut db = Db::open_in_memory().unwrap();
        db.upsert_records(&[record("inst-1", "100", "open"), record("inst-2", "100", "open")])
            .unwrap();

        assert_eq!(db.count_records("inst-1", None).unwrap(), 1);
        assert_eq!(db.count_records("inst-2", None).unwrap(), 1);
    }

    #[test]
    fn test_list_filters() {
        let mut db = Db::open_in_memory().unwrap();
        db.upsert_records(&[
            record("inst-1", "100", "open"),
            record("inst-1", "101", "paid"),
            record("inst-1", "102", "paid"),
        ])
        .unwrap();

        let paid = db
            .list_records("inst-1", Some(ResourceKind::Orders), Some("paid"), 50)
            .unwrap();
        assert_eq!(paid.len(), 2);

        let limited = db.list_records("inst-1", None, None, 2).unwrap();
        assert_eq!(limited.len(), 2);

        let products = db
            .list_records("inst-1", Some(ResourceKind::Products), None, 50)
            .unwrap();
        assert!(products.is_empty());
    }
}
