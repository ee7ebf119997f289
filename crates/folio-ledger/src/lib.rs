// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Folio edition ledger engine.
//!
//! [`Ledger`] ties the purchase store, the audit log and (optionally) the
//! commerce platform together and exposes the ledger operations:
//!
//! - [`Ledger::resequence`] and [`Ledger::mark_invalid`] keep every
//!   product's valid line items numbered densely from 1.
//! - [`Ledger::verify`] detects broken numbering and heals it.
//! - [`Ledger::compare`], [`Ledger::apply_correction`] and
//!   [`Ledger::sync_from_platform`] reconcile local orders with the platform.
//! - [`Ledger::get_valid_editions_for`] lists an owner's editions after
//!   order deduplication.
//!
//! Every mutation of a product's numbering runs under that product's lock.

pub mod assignment;
pub mod audit;
pub mod dedupe;
pub mod editions;
pub mod locks;
pub mod reconcile;
pub mod validity;
pub mod verify;

use std::sync::Arc;

use folio_config::FolioConfig;
use folio_core::{AuditSink, CommercePlatform, FolioError, PurchaseStore};
use serde::Serialize;

pub use assignment::{InvalidationOutcome, InvalidationReason, ResequenceOutcome};
pub use audit::AuditLog;
pub use dedupe::{canonical_key, dedupe};
pub use editions::EditionView;
pub use locks::ProductLocks;
pub use reconcile::{
    CompareTarget, ComparisonStatus, CorrectionOutcome, OrderComparison, ReconciliationReport,
    SyncOutcome,
};
pub use validity::{Validity, classify};
pub use verify::{IntegrityReport, VerifySummary};

/// How an operation ended for a single order or product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "disposition", content = "error")]
pub enum Disposition {
    /// Local state was written (or already matched).
    Applied,
    /// A discrepancy was surfaced and left for a human.
    ReportedOnly,
    /// The operation could not complete.
    Failed(String),
}

/// Tunables the engine reads from configuration.
#[derive(Debug, Clone)]
pub struct LedgerSettings {
    /// `created_by` written on audit rows.
    pub actor: String,
    /// Whole-resequence attempts before giving up.
    pub resequence_attempts: u32,
    /// Platform lookups in flight during a sweep.
    pub reconcile_concurrency: usize,
    /// Orders compared when no limit is given.
    pub default_limit: usize,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self::from(&FolioConfig::default())
    }
}

impl From<&FolioConfig> for LedgerSettings {
    fn from(config: &FolioConfig) -> Self {
        Self {
            actor: config.ledger.actor.clone(),
            resequence_attempts: config.ledger.resequence_attempts,
            reconcile_concurrency: config.reconcile.concurrency,
            default_limit: config.reconcile.default_limit,
        }
    }
}

/// The edition ledger.
pub struct Ledger {
    store: Arc<dyn PurchaseStore>,
    audit: AuditLog,
    platform: Option<Arc<dyn CommercePlatform>>,
    locks: ProductLocks,
    settings: LedgerSettings,
}

impl Ledger {
    pub fn new(
        store: Arc<dyn PurchaseStore>,
        audit: Arc<dyn AuditSink>,
        settings: LedgerSettings,
    ) -> Self {
        Self {
            store,
            audit: AuditLog::new(audit),
            platform: None,
            locks: ProductLocks::new(),
            settings,
        }
    }

    /// Attach the commerce platform used by reconciliation.
    pub fn with_platform(mut self, platform: Arc<dyn CommercePlatform>) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn store(&self) -> &Arc<dyn PurchaseStore> {
        &self.store
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn locks(&self) -> &ProductLocks {
        &self.locks
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    fn platform(&self) -> Result<&Arc<dyn CommercePlatform>, FolioError> {
        self.platform.as_ref().ok_or_else(|| {
            FolioError::Config("no commerce platform configured for reconciliation".into())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_follow_config_defaults() {
        let settings = LedgerSettings::default();
        assert_eq!(settings.actor, "folio");
        assert_eq!(settings.resequence_attempts, 3);
        assert_eq!(settings.reconcile_concurrency, 5);
        assert_eq!(settings.default_limit, 50);
    }

    #[test]
    fn disposition_serializes_with_tag() {
        let failed = serde_json::to_value(Disposition::Failed("boom".into())).unwrap();
        assert_eq!(failed["disposition"], "failed");
        assert_eq!(failed["error"], "boom");
        let applied = serde_json::to_value(Disposition::Applied).unwrap();
        assert_eq!(applied["disposition"], "applied");
    }
}
