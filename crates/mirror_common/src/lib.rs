//! Common types and errors for ShopMirror
//!
//! This crate provides shared data structures used across all ShopMirror
//! components: the installation record read by the sync engine, resource and
//! token kinds, the run summary returned to callers, and the infrastructure
//! error type.

pub mod sanitizer;
pub mod telemetry;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Infrastructure error types shared across ShopMirror crates
///
/// The sync engine has its own taxonomy (`mirror_sync::SyncError`); this enum
/// covers configuration, storage, and I/O failures outside the engine.
#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Invalid input: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, MirrorError>;

/// The kinds of authentication token an installation may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Elevated, company-scoped token
    Company,
    /// Primary per-installation integration token
    Integration,
    /// Webhook-verification token, usable as a last-resort credential
    Webhook,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Company => "company",
            TokenKind::Integration => "integration",
            TokenKind::Webhook => "webhook",
        }
    }
}

impl std::str::FromStr for TokenKind {
    type Err = MirrorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "company" => Ok(TokenKind::Company),
            "integration" => Ok(TokenKind::Integration),
            "webhook" => Ok(TokenKind::Webhook),
            other => Err(MirrorError::ValidationError(format!(
                "Unknown token kind: {}",
                other
            ))),
        }
    }
}

/// Remote resource kinds the engine can mirror
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Products,
    Orders,
}

impl ResourceKind {
    /// URL path segment on the remote API
    pub fn path(&self) -> &'static str {
        match self {
            ResourceKind::Products => "products",
            ResourceKind::Orders => "orders",
        }
    }

    /// Key of the records array in the remote response body
    pub fn items_key(&self) -> &'static str {
        self.path()
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = MirrorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "products" => Ok(ResourceKind::Products),
            "orders" => Ok(ResourceKind::Orders),
            other => Err(MirrorError::ValidationError(format!(
                "Unknown resource kind: {} (expected 'products' or 'orders')",
                other
            ))),
        }
    }
}

/// One merchant's activation of the integration
///
/// Owned by the installation store; the sync engine only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installation {
    /// Opaque identifier assigned by the remote platform
    pub remote_installation_id: String,

    /// Shop identifier used to construct API base URLs
    pub shop_domain: Option<String>,

    /// Inactive installations must never originate a sync run
    pub active: bool,

    /// Elevated company-scoped token
    pub company_token: Option<String>,

    /// Primary per-installation integration token
    pub integration_token: Option<String>,

    /// Webhook-verification token
    pub webhook_token: Option<String>,

    /// Creation timestamp (unix seconds)
    pub created_at: i64,

    /// Last update timestamp (unix seconds)
    pub updated_at: i64,
}

impl Installation {
    /// Look up the stored token of a given kind
    pub fn token(&self, kind: TokenKind) -> Option<&str> {
        let token = match kind {
            TokenKind::Company => &self.company_token,
            TokenKind::Integration => &self.integration_token,
            TokenKind::Webhook => &self.webhook_token,
        };
        token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Counts returned from one synchronization run; never persisted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    /// Records successfully upserted into the mirror
    pub synced: u64,
    /// Records that failed reconciliation (per-batch granularity)
    pub errors: u64,
}

impl SyncSummary {
    pub fn merge(&mut self, other: SyncSummary) {
        self.synced += other.synced;
        self.errors += other.errors;
    }
}

/// Exit code constants for the CLI
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_USAGE: i32 = 2;
pub const EXIT_CONFIG_ERROR: i32 = 101;
