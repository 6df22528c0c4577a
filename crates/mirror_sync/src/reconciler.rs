//! Batch reconciliation of fetched records into the mirror
//!
//! Records are projected into the mirrored shape, split into fixed-size
//! batches, and written through one upsert per batch. A failing batch counts
//! all of its records as errors and the run continues; nothing here retries.

use crate::{Result, SyncError};
use mirror_common::{ResourceKind, SyncSummary};
use mirror_store::{Db, MirroredRecord};
use serde_json::Value;
use tracing::{debug, warn};

/// Storage seam for the reconciler
///
/// One call per batch; implementations must make the whole batch atomic.
pub trait RecordSink {
    fn upsert_batch(&mut self, rows: &[MirroredRecord]) -> anyhow::Result<usize>;
}

impl RecordSink for Db {
    fn upsert_batch(&mut self, rows: &[MirroredRecord]) -> anyhow::Result<usize> {
        self.upsert_records(rows)
    }
}

/// Reconciles a fully-fetched record set for one installation
pub struct Reconciler {
    batch_size: usize,
}

impl Reconciler {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    /// Upsert `records` into the sink in batches, isolating failures
    ///
    /// Never fails for per-record or per-batch problems; the only hard error
    /// is an empty installation id.
    pub fn reconcile(
        &self,
        sink: &mut dyn RecordSink,
        installation_id: &str,
        kind: ResourceKind,
        records: &[Value],
    ) -> Result<SyncSummary> {
        if installation_id.is_empty() {
            return Err(SyncError::ValidationError(
                "installation id must not be empty".to_string(),
            ));
        }

        let mut summary = SyncSummary::default();

        for (batch_index, batch) in records.chunks(self.batch_size).enumerate() {
            let mut rows = Vec::with_capacity(batch.len());
            let mut unprojectable = 0u64;

            for raw in batch {
                match project(installation_id, kind, raw) {
                    Some(row) => rows.push(row),
                    None => {
                        unprojectable += 1;
                        warn!(installation_id, %kind, "Skipping record without usable id");
                    }
                }
            }

            match sink.upsert_batch(&rows) {
                Ok(written) => {
                    summary.synced += written as u64;
                    summary.errors += unprojectable;
                    debug!(installation_id, batch_index, written, "Batch reconciled");
                }
                Err(e) => {
                    // Bounded blast radius: the whole batch is counted as
                    // failed and the next batch proceeds
                    summary.errors += batch.len() as u64;
                    warn!(
                        installation_id,
                        batch_index,
                        batch_len = batch.len(),
                        error = %e,
                        "Batch upsert failed"
                    );
                }
            }
        }

        Ok(summary)
    }
}

/// Project one remote record into its mirrored shape
///
/// Returns `None` when the payload carries no usable id; such records cannot
/// be keyed and are counted as errors by the caller.
pub fn project(installation_id: &str, kind: ResourceKind, raw: &Value) -> Option<MirroredRecord> {
    let remote_record_id = record_id(raw)?;

    Some(MirroredRecord {
        installation_id: installation_id.to_string(),
        remote_record_id,
        kind,
        title: string_field(raw, "title").or_else(|| string_field(raw, "name")),
        customer_name: raw.get("customer").and_then(display_name),
        amount: amount_field(raw),
        status: string_field(raw, "status"),
        item_count: raw
            .get("line_items")
            .or_else(|| raw.get("items"))
            .and_then(Value::as_array)
            .map(|items| items.len() as i64),
        payload: raw.to_string(),
    })
}

fn string_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn record_id(raw: &Value) -> Option<String> {
    match raw.get("id")? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Customer display name: a combined `name` field wins; first/last
/// concatenation is used only when the combined field is absent
fn display_name(customer: &Value) -> Option<String> {
    if let Some(name) = customer.get("name").and_then(Value::as_str) {
        let name = name.trim();
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }

    let first = customer
        .get("first_name")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim();
    let last = customer
        .get("last_name")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim();

    let combined = format!("{} {}", first, last);
    let combined = combined.trim();
    if combined.is_empty() {
        None
    } else {
        Some(combined.to_string())
    }
}

/// Indexed amount: orders carry `total`/`total_price`, products `price`;
/// the remote serializes money both as numbers and as strings
fn amount_field(raw: &Value) -> Option<f64> {
    ["total", "total_price", "price"]
        .iter()
        .find_map(|key| raw.get(*key).and_then(number_like))
}

fn number_like(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    /// In-memory sink with optional fault injection per batch
    #[derive(Default)]
    struct FakeSink {
        rows: HashMap<(String, String), MirroredRecord>,
        fail_on_batch: Option<usize>,
        batches: usize,
    }

    impl RecordSink for FakeSink {
        fn upsert_batch(&mut self, rows: &[MirroredRecord]) -> anyhow::Result<usize> {
            self.batches += 1;
            if self.fail_on_batch == Some(self.batches) {
                anyhow::bail!("injected storage fault");
            }
            for row in rows {
                self.rows.insert(
                    (row.installation_id.clone(), row.remote_record_id.clone()),
                    row.clone(),
                );
            }
            Ok(rows.len())
        }
    }

    fn order(id: u64) -> Value {
        json!({
            "id": id,
            "status": "paid",
            "total": "19.99",
            "customer": {"first_name": "Ada", "last_name": "Lovelace"},
            "line_items": [{"sku": "A"}, {"sku": "B"}]
        })
    }

    #[test]
    fn reconcile_counts_synced_records() {
        let mut sink = FakeSink::default();
        let records: Vec<Value> = (1..=5).map(order).collect();

        let summary = Reconciler::new(100)
            .reconcile(&mut sink, "inst-1", ResourceKind::Orders, &records)
            .unwrap();

        assert_eq!(summary, SyncSummary { synced: 5, errors: 0 });
        assert_eq!(sink.rows.len(), 5);
        assert_eq!(sink.batches, 1);
    }

    #[test]
    fn reconcile_is_idempotent() {
        let mut sink = FakeSink::default();
        let records: Vec<Value> = (1..=7).map(order).collect();
        let reconciler = Reconciler::new(3);

        reconciler
            .reconcile(&mut sink, "inst-1", ResourceKind::Orders, &records)
            .unwrap();
        let after_first = sink.rows.clone();

        let summary = reconciler
            .reconcile(&mut sink, "inst-1", ResourceKind::Orders, &records)
            .unwrap();

        assert_eq!(summary.synced, 7);
        assert_eq!(sink.rows, after_first);
    }

    #[test]
    fn faulty_batch_is_isolated() {
        // 250 records, batches of 100, fault on the second batch
        let mut sink = FakeSink {
            fail_on_batch: Some(2),
            ..Default::default()
        };
        let records: Vec<Value> = (1..=250).map(order).collect();

        let summary = Reconciler::new(100)
            .reconcile(&mut sink, "inst-1", ResourceKind::Orders, &records)
            .unwrap();

        assert_eq!(
            summary,
            SyncSummary {
                synced: 150,
                errors: 100
            }
        );
        assert_eq!(sink.batches, 3);
    }

    #[test]
    fn record_without_id_counts_as_error() {
        let mut sink = FakeSink::default();
        let records = vec![order(1), json!({"status": "paid"}), order(2)];

        let summary = Reconciler::new(100)
            .reconcile(&mut sink, "inst-1", ResourceKind::Orders, &records)
            .unwrap();

        assert_eq!(summary, SyncSummary { synced: 2, errors: 1 });
    }

    #[test]
    fn empty_input_writes_nothing() {
        let mut sink = FakeSink::default();
        let summary = Reconciler::new(100)
            .reconcile(&mut sink, "inst-1", ResourceKind::Orders, &[])
            .unwrap();

        assert_eq!(summary, SyncSummary::default());
        assert_eq!(sink.batches, 0);
    }

    #[test]
    fn empty_installation_id_is_a_precondition_violation() {
        let mut sink = FakeSink::default();
        let result =
            Reconciler::new(100).reconcile(&mut sink, "", ResourceKind::Orders, &[order(1)]);

        assert!(matches!(result, Err(SyncError::ValidationError(_))));
    }

    #[test]
    fn combined_name_wins_over_split_fields() {
        let raw = json!({
            "id": 9,
            "customer": {"name": "Grace Hopper", "first_name": "G", "last_name": "H"}
        });
        let row = project("inst-1", ResourceKind::Orders, &raw).unwrap();
        assert_eq!(row.customer_name.as_deref(), Some("Grace Hopper"));
    }

    #[test]
    fn split_names_concatenated_when_combined_absent() {
        let row = project("inst-1", ResourceKind::Orders, &order(1)).unwrap();
        assert_eq!(row.customer_name.as_deref(), Some("Ada Lovelace"));

        let only_first = json!({"id": 2, "customer": {"first_name": "Ada"}});
        let row = project("inst-1", ResourceKind::Orders, &only_first).unwrap();
        assert_eq!(row.customer_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn projection_extracts_indexed_fields() {
        let row = project("inst-1", ResourceKind::Orders, &order(42)).unwrap();

        assert_eq!(row.remote_record_id, "42");
        assert_eq!(row.amount, Some(19.99));
        assert_eq!(row.status.as_deref(), Some("paid"));
        assert_eq!(row.item_count, Some(2));
        // Full payload retained for later inspection
        let payload: Value = serde_json::from_str(&row.payload).unwrap();
        assert_eq!(payload["id"], 42);
    }

    #[test]
    fn string_ids_and_numeric_prices_accepted() {
        let raw = json!({"id": "prod_abc", "title": "Widget", "price": 12.5, "status": "active"});
        let row = project("inst-1", ResourceKind::Products, &raw).unwrap();

        assert_eq!(row.remote_record_id, "prod_abc");
        assert_eq!(row.title.as_deref(), Some("Widget"));
        assert_eq!(row.amount, Some(12.5));
    }
}
