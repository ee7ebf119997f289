// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subcommand execution.

use std::sync::Arc;

use folio_config::FolioConfig;
use folio_core::{FolioError, OrderCorrection, PluginAdapter, PurchaseStore};
use folio_ledger::{CompareTarget, Disposition, Ledger, LedgerSettings};
use folio_platform::ShopPlatform;
use folio_storage::SqliteStore;
use serde::Serialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::Commands;

/// What a subcommand prints, and whether it should exit non-zero.
pub struct CommandOutput {
    pub value: Value,
    pub failed: bool,
}

impl CommandOutput {
    fn ok(value: impl Serialize) -> Result<Self, FolioError> {
        Self::with_failure(value, false)
    }

    fn with_failure(value: impl Serialize, failed: bool) -> Result<Self, FolioError> {
        let value = serde_json::to_value(value)
            .map_err(|e| FolioError::Internal(format!("failed to serialize output: {e}")))?;
        Ok(Self { value, failed })
    }
}

/// Open the store and, when credentials are configured, the platform.
pub async fn open_ledger(
    config: &FolioConfig,
) -> Result<(Ledger, Arc<SqliteStore>), FolioError> {
    let store = Arc::new(SqliteStore::open(config.storage.clone()).await?);
    let mut ledger = Ledger::new(store.clone(), store.clone(), LedgerSettings::from(config));
    if config.platform.access_token.is_some() {
        let platform = ShopPlatform::new(&config.platform)?;
        ledger = ledger.with_platform(Arc::new(platform));
    } else {
        debug!("no platform access token configured; reconciliation disabled");
    }
    Ok((ledger, store))
}

pub async fn run(
    config: &FolioConfig,
    command: Commands,
    cancel: &CancellationToken,
) -> Result<CommandOutput, FolioError> {
    let (ledger, store) = open_ledger(config).await?;
    let result = execute(&ledger, store.as_ref(), command, cancel).await;
    if let Err(e) = store.shutdown().await {
        warn!(error = %e, "store shutdown failed");
    }
    result
}

async fn execute(
    ledger: &Ledger,
    store: &SqliteStore,
    command: Commands,
    cancel: &CancellationToken,
) -> Result<CommandOutput, FolioError> {
    match command {
        Commands::Resequence {
            product_id: Some(product_id),
            ..
        } => CommandOutput::ok(ledger.resequence(&product_id).await?),
        Commands::Resequence { product_id: None, .. } => {
            let mut outcomes = Vec::new();
            let mut failures = Vec::new();
            for product_id in store.product_ids().await? {
                if cancel.is_cancelled() {
                    break;
                }
                match ledger.resequence(&product_id).await {
                    Ok(outcome) => outcomes.push(outcome),
                    Err(e) => failures.push(json!({
                        "product_id": product_id,
                        "error": e.to_string(),
                    })),
                }
            }
            info!(
                resequenced = outcomes.len(),
                failed = failures.len(),
                "resequence sweep finished"
            );
            let failed = !failures.is_empty();
            let value = json!({ "outcomes": outcomes, "failures": failures });
            CommandOutput::with_failure(value, failed)
        }
        Commands::MarkInvalid {
            line_item_id,
            reason,
        } => CommandOutput::ok(ledger.mark_invalid(&line_item_id, reason).await?),
        Commands::Verify {
            product_id: Some(product_id),
        } => CommandOutput::ok(ledger.verify(&product_id).await?),
        Commands::Verify { product_id: None } => {
            let summary = ledger.verify_all().await?;
            let failed = !summary.failures.is_empty();
            CommandOutput::with_failure(summary, failed)
        }
        Commands::Compare { order, limit } => {
            let target = CompareTarget::from_arg(order.as_deref());
            CommandOutput::ok(ledger.compare(target, limit, cancel).await?)
        }
        Commands::Apply {
            order_id,
            financial_status,
            fulfillment_status,
            cancelled_at,
            archived,
        } => {
            let correction = OrderCorrection {
                financial_status,
                fulfillment_status,
                cancelled_at: cancelled_at.map(|c| c.0),
                archived,
            };
            if correction.is_empty() {
                return Err(FolioError::Config(
                    "apply needs at least one field to correct".into(),
                ));
            }
            let outcome = ledger.apply_correction(&order_id, &correction).await?;
            let failed = matches!(outcome.disposition, Disposition::Failed(_));
            CommandOutput::with_failure(outcome, failed)
        }
        Commands::Sync { order_id } => {
            let outcome = ledger.sync_from_platform(&order_id).await?;
            let failed = matches!(outcome.disposition, Disposition::Failed(_));
            CommandOutput::with_failure(outcome, failed)
        }
        Commands::Editions { owner } => {
            CommandOutput::ok(ledger.get_valid_editions_for(&owner).await?)
        }
        Commands::History {
            product: Some(product_id),
            ..
        } => CommandOutput::ok(ledger.audit().history_for_product(&product_id).await?),
        Commands::History {
            line_item: Some(line_item_id),
            ..
        } => CommandOutput::ok(ledger.audit().history_for_line_item(&line_item_id).await?),
        Commands::History { .. } => Err(FolioError::Config(
            "history needs --product or --line-item".into(),
        )),
    }
}
