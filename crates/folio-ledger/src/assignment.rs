// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Edition number assignment.
//!
//! [`plan_numbering`] is the pure core: given every line item of a product it
//! computes the dense numbering of the valid ones and the writes needed to
//! get there. [`Ledger::resequence`] runs it under the product lock and
//! applies the plan in one store transaction, retrying the whole pass on a
//! failed write.

use std::cmp::Ordering;

use folio_core::{
    FlagChange, FolioError, LedgerEntry, LineItemStatus, NumberChange, NumberingPlan,
    RefundStatus,
};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::validity::{Validity, classify};
use crate::{Ledger, audit};

/// Counts produced by one resequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResequenceOutcome {
    pub product_id: String,
    /// Items whose number was set or changed.
    pub assigned: usize,
    /// Invalid items whose number was cleared.
    pub cleared: usize,
    pub total_valid: usize,
    /// Valid items beyond the product's edition size.
    pub oversold_by: u32,
}

impl ResequenceOutcome {
    /// True when the pass wrote nothing.
    pub fn is_noop(&self) -> bool {
        self.assigned == 0 && self.cleared == 0
    }
}

/// Order of purchase: creation time, then line item id.
///
/// Integer ids sort first and by value, so `"9"` sorts before `"10"`; any
/// other id sorts after them, lexically.
pub fn purchase_order(a: &LedgerEntry, b: &LedgerEntry) -> Ordering {
    a.item
        .created_at
        .cmp(&b.item.created_at)
        .then_with(|| id_key(&a.item.line_item_id).cmp(&id_key(&b.item.line_item_id)))
}

fn id_key(id: &str) -> (bool, Option<u64>, &str) {
    let numeric = id.parse::<u64>().ok();
    (numeric.is_none(), numeric, id)
}

/// Compute the numbering plan for one product.
///
/// Only rows whose number actually changes are written, plus a back-fill of
/// `edition_total` from `edition_size` where an item lacks one. Running the
/// plan against its own result yields an empty plan.
pub fn plan_numbering(
    product_id: &str,
    entries: &[LedgerEntry],
    edition_size: Option<u32>,
    actor: &str,
) -> (NumberingPlan, ResequenceOutcome) {
    let mut valid: Vec<&LedgerEntry> = Vec::new();
    let mut invalid: Vec<(&LedgerEntry, Validity)> = Vec::new();
    for entry in entries {
        match classify(&entry.item, &entry.order) {
            Validity::Valid => valid.push(entry),
            other => invalid.push((entry, other)),
        }
    }
    valid.sort_by(|a, b| purchase_order(a, b));

    let mut plan = NumberingPlan {
        product_id: product_id.to_string(),
        ..NumberingPlan::default()
    };
    let mut outcome = ResequenceOutcome {
        product_id: product_id.to_string(),
        total_valid: valid.len(),
        ..ResequenceOutcome::default()
    };

    for (idx, entry) in valid.iter().enumerate() {
        let item = &entry.item;
        let number = u32::try_from(idx + 1).unwrap_or(u32::MAX);
        let renumber = item.edition_number != Some(number);
        let backfill = item.edition_total.is_none() && edition_size.is_some();
        if !renumber && !backfill {
            continue;
        }
        plan.changes.push(NumberChange {
            line_item_id: item.line_item_id.clone(),
            edition_number: Some(number),
            edition_total: if backfill { edition_size } else { None },
        });
        if renumber {
            plan.events
                .push(audit::numbered(item, number, "resequence", actor));
            outcome.assigned += 1;
        }
    }

    for (entry, validity) in invalid {
        let item = &entry.item;
        if item.edition_number.is_none() {
            continue;
        }
        let cause = match validity {
            Validity::Invalid(cause) => cause.as_str(),
            Validity::Valid => "valid",
        };
        plan.changes.push(NumberChange {
            line_item_id: item.line_item_id.clone(),
            edition_number: None,
            edition_total: None,
        });
        plan.events
            .push(audit::cleared(item, "invalid", cause, actor));
        outcome.cleared += 1;
    }

    if let Some(size) = edition_size {
        let total = u32::try_from(outcome.total_valid).unwrap_or(u32::MAX);
        outcome.oversold_by = total.saturating_sub(size);
    }

    (plan, outcome)
}

/// Why a caller is taking a line item out of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationReason {
    Removed,
    Restocked,
    Refunded,
}

impl InvalidationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidationReason::Removed => "removed",
            InvalidationReason::Restocked => "restocked",
            InvalidationReason::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "removed" => Some(InvalidationReason::Removed),
            "restocked" => Some(InvalidationReason::Restocked),
            "refunded" => Some(InvalidationReason::Refunded),
            _ => None,
        }
    }

    /// The flag write this reason stands for.
    pub fn flag_change(&self) -> FlagChange {
        match self {
            InvalidationReason::Removed => FlagChange {
                status: Some(LineItemStatus::Removed),
                ..FlagChange::default()
            },
            InvalidationReason::Restocked => FlagChange {
                restocked: Some(true),
                ..FlagChange::default()
            },
            InvalidationReason::Refunded => FlagChange {
                refund_status: Some(RefundStatus::Refunded),
                ..FlagChange::default()
            },
        }
    }
}

/// Result of [`Ledger::mark_invalid`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidationOutcome {
    pub line_item_id: String,
    pub product_id: Option<String>,
    pub reason: InvalidationReason,
    /// False when the flag was already set and no number was held.
    pub changed: bool,
    pub cleared_number: Option<u32>,
    /// The follow-up resequence, for items that belong to a product.
    pub resequence: Option<ResequenceOutcome>,
}

impl Ledger {
    /// Recompute dense numbering for `product_id` under its lock.
    pub async fn resequence(&self, product_id: &str) -> Result<ResequenceOutcome, FolioError> {
        let _guard = self.locks.acquire(product_id).await;
        self.resequence_locked(product_id).await
    }

    /// Resequence assuming the caller already holds the product lock.
    ///
    /// A failed pass is retried from a fresh read; the store applies each
    /// plan atomically, so a failure never leaves partial numbering.
    pub(crate) async fn resequence_locked(
        &self,
        product_id: &str,
    ) -> Result<ResequenceOutcome, FolioError> {
        let attempts = self.settings.resequence_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.resequence_once(product_id).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if attempt < attempts && is_retryable(&e) => {
                    warn!(product_id, attempt, error = %e, "resequence failed, retrying");
                    attempt += 1;
                }
                Err(e) => {
                    error!(product_id, attempt, error = %e, "resequence failed");
                    return Err(e);
                }
            }
        }
    }

    async fn resequence_once(&self, product_id: &str) -> Result<ResequenceOutcome, FolioError> {
        let entries = self.store.product_ledger(product_id).await?;
        let product = self.store.get_product(product_id).await?;
        if entries.is_empty() && product.is_none() {
            return Err(FolioError::not_found("product", product_id));
        }
        let edition_size = product.and_then(|p| p.edition_size);

        let (plan, outcome) =
            plan_numbering(product_id, &entries, edition_size, &self.settings.actor);
        if outcome.oversold_by > 0 {
            warn!(
                product_id,
                total_valid = outcome.total_valid,
                edition_size,
                oversold_by = outcome.oversold_by,
                "product has more valid purchases than editions"
            );
        }
        if plan.is_empty() {
            debug!(product_id, total_valid = outcome.total_valid, "numbering already dense");
            return Ok(outcome);
        }

        self.store.apply_numbering(&plan).await?;
        info!(
            product_id,
            assigned = outcome.assigned,
            cleared = outcome.cleared,
            total_valid = outcome.total_valid,
            "product resequenced"
        );
        Ok(outcome)
    }

    /// Flip a line item's validity flag, clear its number and resequence its product.
    ///
    /// The flag write, the cleared number and the audit row land together;
    /// the resequence that follows closes the gap. If it fails, the next
    /// resequence of the product heals the gap.
    pub async fn mark_invalid(
        &self,
        line_item_id: &str,
        reason: InvalidationReason,
    ) -> Result<InvalidationOutcome, FolioError> {
        let item = self
            .store
            .get_line_item(line_item_id)
            .await?
            .ok_or_else(|| FolioError::not_found("line item", line_item_id))?;

        let _guard = match &item.product_id {
            Some(product_id) => Some(self.locks.acquire(product_id).await),
            None => None,
        };
        // Re-read under the lock; a concurrent writer may have renumbered it.
        let item = self
            .store
            .get_line_item(line_item_id)
            .await?
            .ok_or_else(|| FolioError::not_found("line item", line_item_id))?;

        let change = reason.flag_change();
        let already = match reason {
            InvalidationReason::Removed => item.status == LineItemStatus::Removed,
            InvalidationReason::Restocked => item.restocked,
            InvalidationReason::Refunded => item.refund_status == Some(RefundStatus::Refunded),
        };
        let changed = !already || item.edition_number.is_some();

        if changed {
            let mut event =
                audit::cleared(&item, reason.as_str(), "mark_invalid", &self.settings.actor);
            if let Some(status) = change.status {
                event.status = status;
            }
            self.store
                .invalidate_line_item(line_item_id, &change, &event)
                .await?;
            info!(
                line_item_id,
                reason = reason.as_str(),
                cleared_number = item.edition_number,
                "line item marked invalid"
            );
        } else {
            debug!(line_item_id, reason = reason.as_str(), "line item already invalid");
        }

        let resequence = match &item.product_id {
            Some(product_id) => Some(self.resequence_locked(product_id).await?),
            None => None,
        };

        Ok(InvalidationOutcome {
            line_item_id: line_item_id.to_string(),
            product_id: item.product_id.clone(),
            reason,
            changed,
            cleared_number: item.edition_number,
            resequence,
        })
    }
}

fn is_retryable(e: &FolioError) -> bool {
    matches!(e, FolioError::Storage { .. }) || e.is_transient()
}
