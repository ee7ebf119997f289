// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `folio.toml` model. Every section rejects keys it does not know.

use serde::{Deserialize, Serialize};

/// Top-level Folio configuration. Every section may be omitted.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FolioConfig {
    /// Ledger engine behavior.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Purchase record store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Commerce platform API settings.
    #[serde(default)]
    pub platform: PlatformConfig,

    /// Reconciliation sweep settings.
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

/// Ledger engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// `tracing` level for the `folio` crates.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Value written to `created_by` on audit rows when no caller is named.
    #[serde(default = "default_actor")]
    pub actor: String,

    /// How many times a whole resequence is attempted before giving up.
    #[serde(default = "default_resequence_attempts")]
    pub resequence_attempts: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            actor: default_actor(),
            resequence_attempts: default_resequence_attempts(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_actor() -> String {
    "folio".to_string()
}

fn default_resequence_attempts() -> u32 {
    3
}

/// Where purchase records and the audit log live.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// SQLite database file holding orders, line items and events.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Open the database in WAL mode.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("folio").join("folio.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("folio.db"))
        .display()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Commerce platform API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformConfig {
    /// Shop domain, e.g. `example.myshopify.com`.
    #[serde(default)]
    pub shop_domain: Option<String>,

    /// Full admin API base URL. Overrides the URL derived from `shop_domain`.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Admin API access token. `None` disables reconciliation.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Admin API version segment.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first attempt on transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff between retries; doubles on every retry.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            shop_domain: None,
            base_url: None,
            access_token: None,
            api_version: default_api_version(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl PlatformConfig {
    /// The admin API base URL, if one can be determined.
    pub fn resolved_base_url(&self) -> Option<String> {
        if let Some(url) = &self.base_url {
            return Some(url.trim_end_matches('/').to_string());
        }
        self.shop_domain
            .as_ref()
            .map(|shop| format!("https://{shop}/admin/api/{}", self.api_version))
    }
}

fn default_api_version() -> String {
    "2024-10".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    500
}

/// Reconciliation sweep configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReconcileConfig {
    /// Maximum platform requests in flight during a sweep.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Orders compared when no limit is given.
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            default_limit: default_limit(),
        }
    }
}

fn default_concurrency() -> usize {
    5
}

fn default_limit() -> usize {
    50
}
