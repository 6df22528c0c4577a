//! Temporary database setup for integration tests

use crate::fixtures::installation_fixture;
use assert_fs::TempDir;
use mirror_store::Db;

/// Open a mirror database inside a fresh temp directory
///
/// The directory (and database) are cleaned up when the `TempDir` drops; keep
/// it alive for the duration of the test.
pub fn temp_db() -> (TempDir, Db) {
    let temp = TempDir::new().expect("Failed to create temp directory");
    let db = Db::open(&temp.path().join("mirror.db")).expect("Failed to open test database");
    (temp, db)
}

/// Temp database pre-seeded with one active installation
pub fn seeded_db(installation_id: &str) -> (TempDir, Db) {
    let (temp, db) = temp_db();
    db.upsert_installation(&installation_fixture(installation_id))
        .expect("Failed to seed installation");
    (temp, db)
}
