// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconciliation of local orders against the commerce platform.
//!
//! [`Ledger::compare`] only reads: it fetches each order upstream with
//! bounded concurrency and reports field differences. Writes happen only
//! through [`Ledger::apply_correction`] or [`Ledger::sync_from_platform`],
//! both of which lock every product touched by the order and resequence
//! the products whose items changed validity.

use std::collections::BTreeSet;
use std::sync::Arc;

use folio_core::{
    CommercePlatform, FolioError, LineItem, Mismatch, Order, OrderCorrection, PlatformOrder,
    Severity,
};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dedupe::canonical_key;
use crate::validity::{financial_cancelled, is_valid};
use crate::{Disposition, Ledger, ResequenceOutcome, audit};

/// Field name reported when the platform has no record of the order.
pub const FIELD_UPSTREAM_MISSING: &str = "order";

/// Field name of the paid-but-cancelled-unfulfilled alarm.
pub const FIELD_PAID_CANCELLED: &str = "paid_cancelled_unfulfilled";

/// Which local orders a comparison covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompareTarget {
    /// The most recent orders, up to the limit.
    All,
    /// One order by id, or every order sharing a human-facing number.
    Order(String),
}

impl CompareTarget {
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg.map(str::trim).filter(|s| !s.is_empty()) {
            Some(key) => CompareTarget::Order(key.to_string()),
            None => CompareTarget::All,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonStatus {
    Match,
    Mismatch,
    NotFoundUpstream,
    /// The platform could not be reached after retries.
    Unavailable,
}

/// Comparison of one local order with its platform counterpart.
#[derive(Debug, Clone, Serialize)]
pub struct OrderComparison {
    pub order_id: String,
    pub order_number: String,
    pub platform_order_id: Option<String>,
    pub status: ComparisonStatus,
    pub mismatches: Vec<Mismatch>,
    pub error: Option<String>,
    #[serde(skip)]
    pub upstream: Option<PlatformOrder>,
}

impl OrderComparison {
    pub fn has_critical(&self) -> bool {
        self.mismatches
            .iter()
            .any(|m| m.severity == Severity::Critical)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportCounts {
    pub total_checked: usize,
    pub mismatches: usize,
    pub matches: usize,
    pub unavailable: usize,
}

/// Output of [`Ledger::compare`].
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    pub comparisons: Vec<OrderComparison>,
    /// Every finding of `mismatch` or `critical` severity across all orders.
    pub mismatches: Vec<Mismatch>,
    pub counts: ReportCounts,
    /// The sweep stopped early; the comparisons present are complete.
    pub cancelled: bool,
}

impl ReconciliationReport {
    pub fn from_comparisons(comparisons: Vec<OrderComparison>, cancelled: bool) -> Self {
        let mut counts = ReportCounts {
            total_checked: comparisons.len(),
            ..ReportCounts::default()
        };
        for comparison in &comparisons {
            match comparison.status {
                ComparisonStatus::Match => counts.matches += 1,
                ComparisonStatus::Mismatch | ComparisonStatus::NotFoundUpstream => {
                    counts.mismatches += 1
                }
                ComparisonStatus::Unavailable => counts.unavailable += 1,
            }
        }
        let mismatches = comparisons
            .iter()
            .flat_map(|c| c.mismatches.iter())
            .filter(|m| m.severity >= Severity::Mismatch)
            .cloned()
            .collect();
        Self {
            comparisons,
            mismatches,
            counts,
            cancelled,
        }
    }
}

/// Result of [`Ledger::apply_correction`].
#[derive(Debug, Clone, Serialize)]
pub struct CorrectionOutcome {
    pub order_id: String,
    pub changed_fields: Vec<String>,
    /// Line items whose validity flipped.
    pub validity_changes: usize,
    pub resequenced: Vec<ResequenceOutcome>,
    #[serde(flatten)]
    pub disposition: Disposition,
}

/// Result of [`Ledger::sync_from_platform`].
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub comparison: OrderComparison,
    pub correction: Option<CorrectionOutcome>,
    #[serde(flatten)]
    pub disposition: Disposition,
}

fn finding(
    order: &Order,
    field: &str,
    local: Option<String>,
    platform: Option<String>,
    severity: Severity,
) -> Mismatch {
    Mismatch {
        order_id: order.order_id.clone(),
        order_number: order.order_name.clone(),
        field: field.to_string(),
        local,
        platform,
        severity,
    }
}

/// Fulfillment with "no status" and `unfulfilled` folded together.
fn fulfillment_norm(value: Option<String>) -> Option<String> {
    value.filter(|v| v != "unfulfilled")
}

/// Every difference between a local order and its platform counterpart.
///
/// The paid/cancelled/unfulfilled rule is checked on the platform side alone
/// and yields a single critical finding whether or not the local row agrees.
pub fn compare_fields(order: &Order, platform: &PlatformOrder) -> Vec<Mismatch> {
    let mut found = Vec::new();

    let (local_financial, remote_financial) = (order.financial(), platform.financial());
    if local_financial != remote_financial {
        found.push(finding(
            order,
            "financial_status",
            local_financial.clone(),
            remote_financial.clone(),
            Severity::Mismatch,
        ));
    }

    let local_fulfillment = fulfillment_norm(order.fulfillment());
    let remote_fulfillment = fulfillment_norm(platform.fulfillment());
    if local_fulfillment != remote_fulfillment {
        found.push(finding(
            order,
            "fulfillment_status",
            local_fulfillment.clone(),
            remote_fulfillment.clone(),
            Severity::Mismatch,
        ));
    }

    let local_cancelled = financial_cancelled(local_financial.as_deref());
    if local_cancelled != platform.is_cancelled() {
        found.push(finding(
            order,
            "cancelled",
            Some(local_cancelled.to_string()),
            Some(platform.is_cancelled().to_string()),
            Severity::Mismatch,
        ));
    }

    let remote_archived = platform.is_archived();
    match order.archived {
        None if remote_archived => found.push(finding(
            order,
            "archived",
            None,
            Some("true".into()),
            Severity::Info,
        )),
        Some(local) if local != remote_archived => found.push(finding(
            order,
            "archived",
            Some(local.to_string()),
            Some(remote_archived.to_string()),
            Severity::Mismatch,
        )),
        _ => {}
    }

    if remote_financial.as_deref() == Some("paid")
        && platform.is_cancelled()
        && remote_fulfillment.as_deref() != Some("fulfilled")
    {
        found.push(finding(
            order,
            FIELD_PAID_CANCELLED,
            Some(format!(
                "{}/{}",
                local_financial.as_deref().unwrap_or("-"),
                local_fulfillment.as_deref().unwrap_or("unfulfilled")
            )),
            Some(format!(
                "paid/cancelled/{}",
                remote_fulfillment.as_deref().unwrap_or("unfulfilled")
            )),
            Severity::Critical,
        ));
    }

    found
}

/// The status fields to copy from the platform onto `order`.
pub fn correction_from_platform(order: &Order, platform: &PlatformOrder) -> OrderCorrection {
    let mut correction = OrderCorrection::default();
    if let Some(remote) = platform.financial()
        && order.financial().as_ref() != Some(&remote)
    {
        correction.financial_status = Some(remote);
    }
    if fulfillment_norm(order.fulfillment()) != fulfillment_norm(platform.fulfillment()) {
        correction.fulfillment_status =
            Some(platform.fulfillment().unwrap_or_else(|| "unfulfilled".into()));
    }
    let remote_cancelled_at = platform.cancelled_at_utc();
    if order.cancelled_at != remote_cancelled_at {
        correction.cancelled_at = Some(remote_cancelled_at);
    }
    if order.archived.unwrap_or(false) != platform.is_archived() {
        correction.archived = Some(platform.is_archived());
    }
    correction
}

fn products_of(items: &[LineItem]) -> BTreeSet<String> {
    items.iter().filter_map(|item| item.product_id.clone()).collect()
}

fn same_number(hit: &PlatformOrder, number: &str) -> bool {
    hit.name.trim().trim_start_matches('#') == number
        || hit.order_number.is_some_and(|n| n.to_string() == number)
}

impl Ledger {
    /// Compare local orders with the platform.
    ///
    /// Per-order failures become `Unavailable` entries rather than aborting
    /// the sweep. Cancelling `cancel` stops the sweep; comparisons finished
    /// before that are returned.
    pub async fn compare(
        &self,
        target: CompareTarget,
        limit: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<ReconciliationReport, FolioError> {
        let platform = Arc::clone(self.platform()?);
        let limit = limit.unwrap_or(self.settings.default_limit);
        let orders = self.compare_targets(&target, limit).await?;
        let width = self.settings.reconcile_concurrency.max(1);
        info!(orders = orders.len(), concurrency = width, "reconciliation started");

        let comparisons: Vec<OrderComparison> = stream::iter(orders.iter())
            .map(|order| self.compare_order(platform.as_ref(), order))
            .buffered(width)
            .take_until(cancel.cancelled())
            .collect()
            .await;

        let cancelled = comparisons.len() < orders.len();
        if cancelled {
            warn!(
                completed = comparisons.len(),
                requested = orders.len(),
                "reconciliation cancelled"
            );
        }
        let report = ReconciliationReport::from_comparisons(comparisons, cancelled);
        info!(
            total_checked = report.counts.total_checked,
            mismatches = report.counts.mismatches,
            matches = report.counts.matches,
            unavailable = report.counts.unavailable,
            "reconciliation finished"
        );
        Ok(report)
    }

    async fn compare_targets(
        &self,
        target: &CompareTarget,
        limit: usize,
    ) -> Result<Vec<Order>, FolioError> {
        match target {
            CompareTarget::All => self.store.list_orders(limit).await,
            CompareTarget::Order(key) => {
                if let Some(order) = self.store.get_order(key).await? {
                    return Ok(vec![order]);
                }
                let mut orders = self.store.find_orders_by_number(key).await?;
                if orders.is_empty() {
                    return Err(FolioError::not_found("order", key.as_str()));
                }
                orders.truncate(limit.max(1));
                Ok(orders)
            }
        }
    }

    /// Compare one order. Never fails; lookup errors become `Unavailable`.
    pub async fn compare_order(
        &self,
        platform: &dyn CommercePlatform,
        order: &Order,
    ) -> OrderComparison {
        let mut comparison = OrderComparison {
            order_id: order.order_id.clone(),
            order_number: order.order_name.clone(),
            platform_order_id: None,
            status: ComparisonStatus::Match,
            mismatches: Vec::new(),
            error: None,
            upstream: None,
        };

        match find_upstream(platform, order).await {
            Ok(Some(upstream)) => {
                comparison.mismatches = compare_fields(order, &upstream);
                if comparison
                    .mismatches
                    .iter()
                    .any(|m| m.severity >= Severity::Mismatch)
                {
                    comparison.status = ComparisonStatus::Mismatch;
                }
                comparison.platform_order_id = Some(upstream.id.clone());
                comparison.upstream = Some(upstream);
            }
            Ok(None) => {
                warn!(
                    order_id = %order.order_id,
                    order_name = %order.order_name,
                    "order not found upstream"
                );
                comparison.status = ComparisonStatus::NotFoundUpstream;
                comparison.mismatches.push(finding(
                    order,
                    FIELD_UPSTREAM_MISSING,
                    Some(order.order_name.clone()),
                    None,
                    Severity::Critical,
                ));
            }
            Err(e) => {
                warn!(order_id = %order.order_id, error = %e, "platform lookup failed");
                comparison.status = ComparisonStatus::Unavailable;
                comparison.error = Some(e.to_string());
            }
        }
        if comparison.has_critical() {
            warn!(order_id = %order.order_id, "critical reconciliation finding");
        }
        comparison
    }

    /// Overwrite status fields on an order after review.
    ///
    /// Items whose validity flips get a `status_changed` audit row in the
    /// same write, and their products are resequenced afterwards.
    pub async fn apply_correction(
        &self,
        order_id: &str,
        correction: &OrderCorrection,
    ) -> Result<CorrectionOutcome, FolioError> {
        // The lock set comes from an unlocked read; retry until it still
        // matches the items seen under the locks.
        let mut product_ids = products_of(&self.store.line_items_for_order(order_id).await?);
        let (_guards, items) = loop {
            let guards = self.locks.acquire_many(product_ids.iter().cloned()).await;
            let items = self.store.line_items_for_order(order_id).await?;
            let locked = products_of(&items);
            if locked == product_ids {
                break (guards, items);
            }
            debug!(order_id, "order products changed while locking, retrying");
            drop(guards);
            product_ids = locked;
        };

        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| FolioError::not_found("order", order_id))?;

        let changed: Vec<String> = correction
            .changed_fields(&order)
            .into_iter()
            .map(String::from)
            .collect();
        let mut outcome = CorrectionOutcome {
            order_id: order_id.to_string(),
            changed_fields: changed.clone(),
            validity_changes: 0,
            resequenced: Vec::new(),
            disposition: Disposition::Applied,
        };
        if changed.is_empty() {
            debug!(order_id, "correction matches stored order");
            return Ok(outcome);
        }

        let corrected = correction.applied_to(&order);
        let mut affected = BTreeSet::new();
        let mut events = Vec::new();
        for item in &items {
            let before = is_valid(item, &order);
            let after = is_valid(item, &corrected);
            if before == after {
                continue;
            }
            events.push(audit::validity_changed(
                item,
                after,
                "order_correction",
                json!({ "fields": changed }),
                &self.settings.actor,
            ));
            if let Some(product_id) = &item.product_id {
                affected.insert(product_id.clone());
            }
        }
        outcome.validity_changes = events.len();

        self.store
            .apply_order_correction(order_id, correction, &events)
            .await?;
        info!(
            order_id,
            fields = ?changed,
            validity_changes = outcome.validity_changes,
            "order correction applied"
        );

        let mut failures = Vec::new();
        for product_id in affected {
            match self.resequence_locked(&product_id).await {
                Ok(resequenced) => outcome.resequenced.push(resequenced),
                Err(e) => {
                    error!(
                        order_id,
                        product_id = %product_id,
                        error = %e,
                        "resequence after correction failed"
                    );
                    failures.push(format!("{product_id}: {e}"));
                }
            }
        }
        if !failures.is_empty() {
            outcome.disposition = Disposition::Failed(format!(
                "correction applied; resequence failed for {}",
                failures.join("; ")
            ));
        }
        Ok(outcome)
    }

    /// Compare one order and copy the platform's status fields onto it.
    ///
    /// Refuses to write when the order is missing upstream or carries a
    /// critical finding; those need a human.
    pub async fn sync_from_platform(&self, order_id: &str) -> Result<SyncOutcome, FolioError> {
        let platform = Arc::clone(self.platform()?);
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| FolioError::not_found("order", order_id))?;
        let comparison = self.compare_order(platform.as_ref(), &order).await;

        let refuse = |comparison: OrderComparison, disposition: Disposition| SyncOutcome {
            comparison,
            correction: None,
            disposition,
        };

        if comparison.status == ComparisonStatus::Unavailable {
            let message = comparison
                .error
                .clone()
                .unwrap_or_else(|| "platform unavailable".into());
            return Ok(refuse(comparison, Disposition::Failed(message)));
        }
        if comparison.status == ComparisonStatus::NotFoundUpstream || comparison.has_critical() {
            warn!(order_id, status = ?comparison.status, "sync refused, manual review required");
            return Ok(refuse(comparison, Disposition::ReportedOnly));
        }
        let Some(upstream) = comparison.upstream.as_ref() else {
            return Ok(refuse(
                comparison,
                Disposition::Failed("comparison carried no platform order".into()),
            ));
        };

        let correction = correction_from_platform(&order, upstream);
        if correction.is_empty() {
            return Ok(refuse(comparison, Disposition::Applied));
        }
        let applied = self.apply_correction(order_id, &correction).await?;
        let disposition = applied.disposition.clone();
        Ok(SyncOutcome {
            comparison,
            correction: Some(applied),
            disposition,
        })
    }
}

/// Look the order up by id, then by `#N` and `N`.
async fn find_upstream(
    platform: &dyn CommercePlatform,
    order: &Order,
) -> Result<Option<PlatformOrder>, FolioError> {
    if let Some(found) = platform.get_order(&order.order_id).await? {
        return Ok(Some(found));
    }
    let number = match order.order_number {
        Some(n) => n.to_string(),
        None => canonical_key(order),
    };
    for query in [format!("#{number}"), number.clone()] {
        let hits = platform.search_orders_by_name(&query).await?;
        if let Some(hit) = hits.into_iter().find(|h| same_number(h, &number)) {
            debug!(
                order_id = %order.order_id,
                platform_id = %hit.id,
                query = %query,
                "matched upstream by name"
            );
            return Ok(Some(hit));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_test_utils::fixtures::{order, platform_order};

    #[test]
    fn identical_orders_match() {
        let local = order("1001", "#1001");
        let remote = platform_order("1001", "#1001");
        assert!(compare_fields(&local, &remote).is_empty());
    }

    #[test]
    fn unfulfilled_and_missing_fulfillment_are_equal() {
        let mut local = order("1001", "#1001");
        local.fulfillment_status = None;
        let mut remote = platform_order("1001", "#1001");
        remote.fulfillment_status = Some("unfulfilled".into());
        assert!(compare_fields(&local, &remote).is_empty());
    }

    #[test]
    fn paid_cancelled_unfulfilled_is_flagged_once() {
        let mut local = order("1001", "#1001");
        local.fulfillment_status = None;
        let mut remote = platform_order("1001", "#1001");
        remote.fulfillment_status = None;
        remote.cancelled_at = Some("2026-02-01T10:00:00Z".into());

        let found = compare_fields(&local, &remote);
        let critical: Vec<_> = found
            .iter()
            .filter(|m| m.severity == Severity::Critical)
            .collect();
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].field, FIELD_PAID_CANCELLED);
        assert!(found.iter().any(|m| m.field == "cancelled"));
    }

    #[test]
    fn archived_severity_depends_on_local_value() {
        let mut remote = platform_order("1001", "#1001");
        remote.closed_at = Some("2026-02-01T10:00:00Z".into());

        let unknown = order("1001", "#1001");
        let found = compare_fields(&unknown, &remote);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::Info);

        let mut stale = order("1001", "#1001");
        stale.archived = Some(false);
        let found = compare_fields(&stale, &remote);
        assert_eq!(found[0].severity, Severity::Mismatch);
    }

    #[test]
    fn correction_copies_only_differing_fields() {
        let local = order("1001", "#1001");
        let mut remote = platform_order("1001", "#1001");
        remote.financial_status = Some("refunded".into());
        let correction = correction_from_platform(&local, &remote);
        assert_eq!(correction.financial_status.as_deref(), Some("refunded"));
        assert!(correction.fulfillment_status.is_none());
        assert!(correction.cancelled_at.is_none());
        assert!(correction.archived.is_none());
    }

    #[test]
    fn correction_keeps_financial_status_platform_omits() {
        let local = order("1001", "#1001");
        let mut remote = platform_order("1001", "#1001");
        remote.financial_status = None;
        remote.fulfillment_status = Some("partial".into());
        let correction = correction_from_platform(&local, &remote);
        assert!(correction.financial_status.is_none());
        assert_eq!(correction.fulfillment_status.as_deref(), Some("partial"));
        assert_eq!(
            correction.changed_fields(&local),
            vec!["fulfillment_status"]
        );
    }

    #[test]
    fn report_counts_and_filters_info() {
        let local = order("1", "#1");
        let info = finding(&local, "archived", None, Some("true".into()), Severity::Info);
        let bad = finding(&local, "financial_status", None, None, Severity::Mismatch);
        let base = OrderComparison {
            order_id: "1".into(),
            order_number: "#1".into(),
            platform_order_id: Some("1".into()),
            status: ComparisonStatus::Match,
            mismatches: vec![info],
            error: None,
            upstream: None,
        };
        let mut mismatched = base.clone();
        mismatched.status = ComparisonStatus::Mismatch;
        mismatched.mismatches = vec![bad];
        let mut down = base.clone();
        down.status = ComparisonStatus::Unavailable;
        down.mismatches.clear();

        let report = ReconciliationReport::from_comparisons(vec![base, mismatched, down], false);
        assert_eq!(
            report.counts,
            ReportCounts {
                total_checked: 3,
                mismatches: 1,
                matches: 1,
                unavailable: 1,
            }
        );
        assert_eq!(report.mismatches.len(), 1);
        assert_eq!(report.mismatches[0].field, "financial_status");
    }

    #[test]
    fn target_from_arg() {
        assert_eq!(CompareTarget::from_arg(None), CompareTarget::All);
        assert_eq!(CompareTarget::from_arg(Some("  ")), CompareTarget::All);
        assert_eq!(
            CompareTarget::from_arg(Some("#1114")),
            CompareTarget::Order("#1114".into())
        );
    }
}
