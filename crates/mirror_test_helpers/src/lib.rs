//! Shared test utilities for ShopMirror test suites
//!
//! This crate provides common testing utilities to eliminate duplication
//! across test suites and ensure consistent fixtures.
//!
//! # Modules
//!
//! - [`store`]: temporary database setup
//! - [`fixtures`]: installation and remote-payload builders
//! - [`logging`]: test logging configuration
//!
//! # Example
//!
//! ```rust
//! use mirror_test_helpers::prelude::*;
//!
//! fn my_test() {
//!     let (_temp, db) = temp_db();
//!     db.upsert_installation(&installation_fixture("inst-1")).unwrap();
//! }
//! ```

pub mod fixtures;
pub mod logging;
pub mod store;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::{installation_fixture, order_payload, product_payload};
    pub use crate::logging::{init_test_logging, suppress_logs};
    pub use crate::store::{seeded_db, temp_db};
}
