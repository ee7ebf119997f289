// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./folio.toml` > `~/.config/folio/folio.toml` > `/etc/folio/folio.toml`
//! with environment variable overrides via the `FOLIO_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::FolioConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/folio/folio.toml`
/// 3. `~/.config/folio/folio.toml`
/// 4. `./folio.toml`
/// 5. `FOLIO_*` environment variables
pub fn load_config() -> Result<FolioConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<FolioConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FolioConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<FolioConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FolioConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(FolioConfig::default()))
        .merge(Toml::file("/etc/folio/folio.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("folio/folio.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("folio.toml"))
        .merge(env_provider())
}

/// Environment provider with explicit section mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because keys contain
/// underscores: `FOLIO_PLATFORM_ACCESS_TOKEN` must map to
/// `platform.access_token`, not `platform.access.token`.
fn env_provider() -> Env {
    Env::prefixed("FOLIO_").map(|key| {
        let mapped = key
            .as_str()
            .replacen("ledger_", "ledger.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("platform_", "platform.", 1)
            .replacen("reconcile_", "reconcile.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_nested_keys_with_underscores() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("FOLIO_PLATFORM_ACCESS_TOKEN", "shpat_test");
            jail.set_env("FOLIO_RECONCILE_CONCURRENCY", "8");
            jail.create_file("folio.toml", "[storage]\ndatabase_path = \"ledger.db\"\n")?;

            let config = load_config_from_path(Path::new("folio.toml"))?;
            assert_eq!(config.platform.access_token.as_deref(), Some("shpat_test"));
            assert_eq!(config.reconcile.concurrency, 8);
            assert_eq!(config.storage.database_path, "ledger.db");
            Ok(())
        });
    }
}
