// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::FolioConfig;

/// Upper bound on concurrent platform requests during a sweep.
pub const MAX_RECONCILE_CONCURRENCY: usize = 16;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &FolioConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.ledger.actor.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "ledger.actor must not be empty".to_string(),
        });
    }

    if config.ledger.resequence_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "ledger.resequence_attempts must be at least 1".to_string(),
        });
    }

    let concurrency = config.reconcile.concurrency;
    if concurrency == 0 || concurrency > MAX_RECONCILE_CONCURRENCY {
        errors.push(ConfigError::Validation {
            message: format!(
                "reconcile.concurrency must be between 1 and \
                 {MAX_RECONCILE_CONCURRENCY}, got {concurrency}"
            ),
        });
    }

    if config.reconcile.default_limit == 0 {
        errors.push(ConfigError::Validation {
            message: "reconcile.default_limit must be at least 1".to_string(),
        });
    }

    if config.platform.timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "platform.timeout_secs must be at least 1".to_string(),
        });
    }

    if let Some(url) = &config.platform.base_url
        && !(url.starts_with("http://") || url.starts_with("https://"))
    {
        errors.push(ConfigError::Validation {
            message: format!("platform.base_url `{url}` must start with http:// or https://"),
        });
    }

    if let Some(shop) = &config.platform.shop_domain
        && (shop.trim().is_empty() || shop.contains('/'))
    {
        errors.push(ConfigError::Validation {
            message: format!("platform.shop_domain `{shop}` must be a bare host name"),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
