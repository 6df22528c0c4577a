//! # ShopMirror Storage
//!
//! SQLite-backed storage collaborator for the sync engine:
//!
//! - **Installations**: merchant activations, read by the engine before a run
//! - **Mirrored records**: local projections of remote products/orders,
//!   written through a batched upsert keyed on
//!   `(installation_id, remote_record_id)`
//! - **Migrations**: `PRAGMA user_version` stepped schema history
//!
//! The sync engine talks to this crate through its own trait seams; nothing in
//! here knows about pagination or credentials.

pub mod db;
pub mod records;

pub use db::{Db, DbStats};
pub use records::{MirroredRecord, RecordRow};
