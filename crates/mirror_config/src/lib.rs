//! Configuration management for ShopMirror
//!
//! This crate handles loading and validating `shopmirror.toml`.

use mirror_common::{MirrorError, Result, TokenKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP trigger server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Remote platform API settings
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Sync engine tuning
    #[serde(default)]
    pub sync: SyncConfig,

    /// Credential selection policy
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Local storage settings
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Server configuration ([server])
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8787".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// Remote API configuration ([remote])
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Records requested per page (remote caps this at 50)
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Per-attempt HTTP timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_per_page() -> u32 {
    25
}
fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl RemoteConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Sync engine configuration ([sync])
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Records per storage upsert batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Upper bound on one complete sync run, in seconds
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
}

fn default_batch_size() -> usize {
    100
}
fn default_run_timeout_secs() -> u64 {
    600
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            run_timeout_secs: default_run_timeout_secs(),
        }
    }
}

impl SyncConfig {
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

/// Credential policy configuration ([credentials])
///
/// The engine never inspects token prefixes; it honors this order and nothing
/// else. Operators who trust per-installation tokens over elevated tokens
/// reorder the list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default = "default_priority")]
    pub priority: Vec<TokenKind>,
}

fn default_priority() -> Vec<TokenKind> {
    vec![TokenKind::Company, TokenKind::Integration, TokenKind::Webhook]
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            priority: default_priority(),
        }
    }
}

/// Database configuration ([database])
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("shopmirror.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults when the
    /// file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| MirrorError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| MirrorError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration bounds
    pub fn validate(&self) -> Result<()> {
        if self.remote.per_page == 0 || self.remote.per_page > 50 {
            return Err(MirrorError::ConfigError(format!(
                "remote.per_page must be between 1 and 50, got {}",
                self.remote.per_page
            )));
        }
        if self.sync.batch_size == 0 {
            return Err(MirrorError::ConfigError(
                "sync.batch_size must be greater than 0".to_string(),
            ));
        }
        if self.remote.request_timeout_secs == 0 {
            return Err(MirrorError::ConfigError(
                "remote.request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.credentials.priority.is_empty() {
            return Err(MirrorError::ConfigError(
                "credentials.priority must list at least one token kind".to_string(),
            ));
        }
        Ok(())
    }
}

/// Commented template written by `shopmirror init`
pub fn default_config_toml() -> &'static str {
    r#"# ShopMirror configuration

[server]
bind_addr = "127.0.0.1:8787"

[remote]
# Records per page (remote API caps this at 50)
per_page = 25
request_timeout_secs = 30

[sync]
batch_size = 100
run_timeout_secs = 600

[credentials]
# Token kinds tried in order; the first one present on an installation wins
priority = ["company", "integration", "webhook"]

[database]
path = "shopmirror.db"
"#
}
