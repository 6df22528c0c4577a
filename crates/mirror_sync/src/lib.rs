//! # ShopMirror Sync Engine
//!
//! Walks the remote platform's paginated resource API and reconciles the
//! results into the local mirror with idempotent semantics.
//!
//! ## Architecture
//!
//! - **Resolver**: pure token/endpoint selection from a stored installation
//! - **Remote Client**: one page per call, falling through candidate base URLs
//! - **Reconciler**: fixed-size batches, one upsert per batch, failures
//!   isolated to the batch
//! - **Orchestrator**: drives a full run and returns `{synced, errors}`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mirror_common::ResourceKind;
//! use mirror_config::Config;
//! use mirror_store::Db;
//! use mirror_sync::SyncOrchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let mut db = Db::open(&config.database.path)?;
//!     let orchestrator = SyncOrchestrator::from_config(&config)?;
//!
//!     let summary = orchestrator
//!         .run(&mut db, "inst-123", ResourceKind::Orders)
//!         .await?;
//!     println!("synced {} / errors {}", summary.synced, summary.errors);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod orchestrator;
pub mod reconciler;
pub mod resolver;

pub use client::{Page, PageMeta, RemoteClient};
pub use orchestrator::{InstallationLookup, PageFetcher, SyncOrchestrator};
pub use reconciler::{Reconciler, RecordSink};
pub use resolver::{resolve, EndpointCandidate, ResolvedAccess};

use mirror_common::ResourceKind;

/// Common result type for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur during a sync run
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Installation has no shop domain; no base URL can be built
    #[error("Installation {installation_id} has no shop domain")]
    MissingShopDomain { installation_id: String },

    /// None of the installation's token slots holds a usable credential
    #[error("Installation {installation_id} has no usable credential")]
    NoUsableCredential { installation_id: String },

    #[error("Installation not found: {0}")]
    InstallationNotFound(String),

    /// Inactive installations must never originate a sync run
    #[error("Installation {0} is inactive")]
    InactiveInstallation(String),

    /// Every candidate base URL failed for one page fetch
    #[error(
        "All endpoints exhausted fetching {resource} page {page} after {attempts} attempts: {last_error}"
    )]
    AllEndpointsExhausted {
        resource: ResourceKind,
        page: u32,
        attempts: usize,
        last_error: String,
    },

    /// A 2xx response whose body could not be parsed
    #[error("Invalid response from remote API: {0}")]
    InvalidResponse(String),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] anyhow::Error),

    #[error("Invalid input: {0}")]
    ValidationError(String),

    /// Total run timeout elapsed before the run completed
    #[error("Sync run exceeded {seconds}s timeout")]
    RunTimeout { seconds: u64 },
}
