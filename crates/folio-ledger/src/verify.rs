// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integrity checks over stored numbering, with self-healing.
//!
//! Broken numbering is an alarm, not a normal error path: each finding is
//! logged at error level and written to the audit log, then the product is
//! resequenced.

use std::collections::HashMap;

use folio_core::{FolioError, LedgerEntry};
use serde::Serialize;
use tracing::{error, info};

use crate::validity::is_valid;
use crate::{Ledger, ResequenceOutcome, audit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Two valid items share a number.
    Duplicate,
    /// A valid item's number lies beyond the count of valid items.
    Gap,
    /// A valid item has no number.
    Unnumbered,
    /// An invalid item still holds a number.
    Stray,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::Duplicate => "duplicate",
            ViolationKind::Gap => "gap",
            ViolationKind::Unnumbered => "unnumbered",
            ViolationKind::Stray => "stray",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub line_item_id: String,
    pub edition_number: Option<u32>,
    pub detail: String,
}

/// Result of verifying one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub product_id: String,
    pub violations: Vec<Violation>,
    /// The healing resequence, when violations were found.
    pub healed: Option<ResequenceOutcome>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Result of verifying every product.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerifySummary {
    pub reports: Vec<IntegrityReport>,
    /// `(product_id, error)` for products that could not be verified.
    pub failures: Vec<(String, String)>,
}

/// Every way the product's stored numbering departs from `1..=k`.
pub fn find_violations(entries: &[LedgerEntry]) -> Vec<Violation> {
    let valid_count = entries
        .iter()
        .filter(|e| is_valid(&e.item, &e.order))
        .count();
    let mut holders: HashMap<u32, Vec<&str>> = HashMap::new();
    let mut violations = Vec::new();

    for entry in entries {
        let item = &entry.item;
        let valid = is_valid(item, &entry.order);
        match (valid, item.edition_number) {
            (true, Some(n)) => {
                holders.entry(n).or_default().push(&item.line_item_id);
                if n as usize > valid_count {
                    violations.push(Violation {
                        kind: ViolationKind::Gap,
                        line_item_id: item.line_item_id.clone(),
                        edition_number: Some(n),
                        detail: format!("number {n} exceeds {valid_count} valid items"),
                    });
                }
            }
            (true, None) => violations.push(Violation {
                kind: ViolationKind::Unnumbered,
                line_item_id: item.line_item_id.clone(),
                edition_number: None,
                detail: "valid item has no edition number".into(),
            }),
            (false, Some(n)) => violations.push(Violation {
                kind: ViolationKind::Stray,
                line_item_id: item.line_item_id.clone(),
                edition_number: Some(n),
                detail: format!("invalid item still holds number {n}"),
            }),
            (false, None) => {}
        }
    }

    let mut duplicated: Vec<(u32, Vec<&str>)> =
        holders.into_iter().filter(|(_, ids)| ids.len() > 1).collect();
    duplicated.sort_by_key(|(n, _)| *n);
    for (n, ids) in duplicated {
        for id in &ids {
            violations.push(Violation {
                kind: ViolationKind::Duplicate,
                line_item_id: id.to_string(),
                edition_number: Some(n),
                detail: format!("number {n} held by {}", ids.join(", ")),
            });
        }
    }
    violations
}

impl Ledger {
    /// Check one product's numbering and heal it if broken.
    pub async fn verify(&self, product_id: &str) -> Result<IntegrityReport, FolioError> {
        let _guard = self.locks.acquire(product_id).await;
        let entries = self.store.product_ledger(product_id).await?;
        let violations = find_violations(&entries);
        if violations.is_empty() {
            info!(product_id, items = entries.len(), "numbering verified");
            return Ok(IntegrityReport {
                product_id: product_id.to_string(),
                violations,
                healed: None,
            });
        }

        let detail = violations
            .iter()
            .map(|v| format!("{}:{}", v.kind.as_str(), v.line_item_id))
            .collect::<Vec<_>>()
            .join(", ");
        error!(
            product_id,
            violations = violations.len(),
            detail = %detail,
            "edition numbering invariant violated"
        );

        let events: Vec<_> = violations
            .iter()
            .filter_map(|v| {
                entries
                    .iter()
                    .find(|e| e.item.line_item_id == v.line_item_id)
                    .map(|e| {
                        audit::integrity_violation(
                            &e.item,
                            v.kind.as_str(),
                            &v.detail,
                            &self.settings.actor,
                        )
                    })
            })
            .collect();
        self.audit.record_all(&events).await?;

        let healed = self.resequence_locked(product_id).await?;
        let remaining = find_violations(&self.store.product_ledger(product_id).await?);
        if !remaining.is_empty() {
            return Err(FolioError::InvariantViolation {
                product_id: product_id.to_string(),
                detail: format!("{} violations remain after resequence", remaining.len()),
            });
        }
        info!(product_id, assigned = healed.assigned, cleared = healed.cleared, "numbering healed");
        Ok(IntegrityReport {
            product_id: product_id.to_string(),
            violations,
            healed: Some(healed),
        })
    }

    /// Verify every product that has line items. Failures are collected per product.
    pub async fn verify_all(&self) -> Result<VerifySummary, FolioError> {
        let mut summary = VerifySummary::default();
        for product_id in self.store.product_ids().await? {
            match self.verify(&product_id).await {
                Ok(report) => summary.reports.push(report),
                Err(e) => {
                    error!(product_id = %product_id, error = %e, "verification failed");
                    summary.failures.push((product_id, e.to_string()));
                }
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::{LineItem, LineItemStatus, Order};
    use folio_test_utils::fixtures::{entry, line_item, order};

    fn paid_item(id: &str, order: &Order, minutes: i64) -> LineItem {
        line_item(id, order, "P", minutes)
    }

    #[test]
    fn dense_numbering_has_no_violations() {
        let o = order("1", "#1");
        let mut a = paid_item("a", &o, 0);
        a.edition_number = Some(1);
        let mut b = paid_item("b", &o, 1);
        b.edition_number = Some(2);
        assert!(find_violations(&[entry(a, &o), entry(b, &o)]).is_empty());
    }

    #[test]
    fn detects_each_kind() {
        let o = order("1", "#1");
        let mut dup_a = paid_item("a", &o, 0);
        dup_a.edition_number = Some(1);
        let mut dup_b = paid_item("b", &o, 1);
        dup_b.edition_number = Some(1);
        let mut far = paid_item("c", &o, 2);
        far.edition_number = Some(7);
        let bare = paid_item("d", &o, 3);
        let mut stray = paid_item("e", &o, 4);
        stray.status = LineItemStatus::Removed;
        stray.edition_number = Some(2);

        let found = find_violations(&[
            entry(dup_a, &o),
            entry(dup_b, &o),
            entry(far, &o),
            entry(bare, &o),
            entry(stray, &o),
        ]);
        let kinds: Vec<(ViolationKind, &str)> = found
            .iter()
            .map(|v| (v.kind, v.line_item_id.as_str()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (ViolationKind::Gap, "c"),
                (ViolationKind::Unnumbered, "d"),
                (ViolationKind::Stray, "e"),
                (ViolationKind::Duplicate, "a"),
                (ViolationKind::Duplicate, "b"),
            ]
        );
    }
}
