// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Numbering, verification and owner views against a real store.

use folio_core::{
    EditionEventType, FolioError, LineItem, LineItemStatus, Order, Product, PurchaseStore,
};
use folio_ledger::{IntegrityReport, InvalidationReason};
use folio_test_utils::TestHarness;
use folio_test_utils::fixtures::{OWNER_EMAIL, OWNER_ID, line_item, numbered, order};

async fn harness() -> TestHarness {
    TestHarness::builder()
        .with_product("P", Some(25))
        .build()
        .await
        .unwrap()
}

async fn paid_order(harness: &TestHarness, id: &str, name: &str) -> Order {
    let o = order(id, name);
    harness.insert_order(&o).await.unwrap();
    o
}

fn item(id: &str, order: &Order, minutes: i64) -> LineItem {
    line_item(id, order, "P", minutes)
}

// ---- Invalidation ----

#[tokio::test]
async fn test_mark_invalid_twice_records_one_transition() {
    let h = harness().await;
    let o = paid_order(&h, "1001", "#1001").await;
    h.insert_item(&item("a", &o, 1)).await.unwrap();
    h.ledger.resequence("P").await.unwrap();

    h.ledger
        .mark_invalid("a", InvalidationReason::Refunded)
        .await
        .unwrap();
    let second = h
        .ledger
        .mark_invalid("a", InvalidationReason::Refunded)
        .await
        .unwrap();
    assert!(!second.changed);
    assert_eq!(second.cleared_number, None);

    let status_changes = h
        .ledger
        .audit()
        .history_for_line_item("a")
        .await
        .unwrap()
        .iter()
        .filter(|e| e.event_type == EditionEventType::StatusChanged)
        .count();
    assert_eq!(status_changes, 1);
}

#[tokio::test]
async fn test_unknown_targets_are_not_found() {
    let h = harness().await;
    assert!(matches!(
        h.ledger.resequence("nope").await.unwrap_err(),
        FolioError::NotFound { .. }
    ));
    assert!(matches!(
        h.ledger
            .mark_invalid("nope", InvalidationReason::Removed)
            .await
            .unwrap_err(),
        FolioError::NotFound { .. }
    ));
}

#[tokio::test]
async fn test_known_product_without_items_is_noop() {
    let h = harness().await;
    let outcome = h.ledger.resequence("P").await.unwrap();
    assert!(outcome.is_noop());
    assert_eq!(outcome.total_valid, 0);
}

// ---- Verification ----

#[tokio::test]
async fn test_verify_records_stray_and_gap_then_heals() {
    let h = harness().await;
    let o = paid_order(&h, "1001", "#1001").await;
    let mut a = item("a", &o, 1);
    a.edition_number = Some(1);
    let mut b = item("b", &o, 2);
    b.edition_number = Some(3);
    let mut removed = item("r", &o, 3);
    removed.status = LineItemStatus::Removed;
    removed.edition_number = Some(2);
    for row in [a, b, removed] {
        h.insert_item(&row).await.unwrap();
    }

    let report = h.ledger.verify("P").await.unwrap();
    assert_eq!(report.violations.len(), 2);
    let healed = report.healed.unwrap();
    assert_eq!((healed.assigned, healed.cleared), (1, 1));
    assert_eq!(
        h.numbers("P").await.unwrap(),
        numbered(&[("a", Some(1)), ("b", Some(2)), ("r", None)])
    );

    let recorded = h
        .ledger
        .audit()
        .history_for_product("P")
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.event_type == EditionEventType::IntegrityViolation)
        .count();
    assert_eq!(recorded, 2);

    let again = h.ledger.verify_all().await.unwrap();
    assert!(again.failures.is_empty());
    assert!(again.reports.iter().all(IntegrityReport::is_clean));
}

// ---- Owner editions ----

#[tokio::test]
async fn test_manual_duplicate_yields_one_edition() {
    let h = harness().await;
    let platform = paid_order(&h, "5501", "#1114").await;
    let manual = paid_order(&h, "manual-1114", "1114").await;
    let mut from_platform = item("li-platform", &platform, 0);
    from_platform.edition_number = Some(1);
    let mut from_manual = item("li-manual", &manual, 1);
    from_manual.edition_number = Some(2);
    h.insert_item(&from_platform).await.unwrap();
    h.insert_item(&from_manual).await.unwrap();

    let editions = h.ledger.get_valid_editions_for(OWNER_EMAIL).await.unwrap();
    assert_eq!(editions.len(), 1);
    assert_eq!(editions[0].line_item_id, "li-platform");
    assert_eq!(editions[0].edition_total, Some(25));
    assert_eq!(
        editions[0].certificate_access_token.as_deref(),
        Some("cert-li-platform")
    );
}

#[tokio::test]
async fn test_editions_skip_invalid_unnumbered_and_productless_items() {
    let h = harness().await;
    let o = paid_order(&h, "1001", "#1001").await;
    let mut kept = item("kept", &o, 0);
    kept.edition_number = Some(1);
    let mut removed = item("removed", &o, 1);
    removed.status = LineItemStatus::Removed;
    let pending = item("pending", &o, 2);
    let mut loose = item("loose", &o, 3);
    loose.product_id = None;
    loose.edition_number = Some(1);
    for row in [kept, removed, pending, loose] {
        h.insert_item(&row).await.unwrap();
    }

    let editions = h.ledger.get_valid_editions_for(OWNER_ID).await.unwrap();
    let ids: Vec<_> = editions.iter().map(|e| e.line_item_id.as_str()).collect();
    assert_eq!(ids, vec!["kept"]);
}

#[tokio::test]
async fn test_editions_sorted_by_product_then_number() {
    let h = harness().await;
    h.store
        .upsert_product(&Product {
            product_id: "A".into(),
            title: None,
            edition_size: None,
        })
        .await
        .unwrap();
    let o = paid_order(&h, "1001", "#1001").await;
    let mut p2 = item("p2", &o, 0);
    p2.edition_number = Some(2);
    let mut p1 = item("p1", &o, 1);
    p1.edition_number = Some(1);
    let mut a7 = line_item("a7", &o, "A", 2);
    a7.edition_number = Some(7);
    for row in [p2, p1, a7] {
        h.insert_item(&row).await.unwrap();
    }

    let editions = h.ledger.get_valid_editions_for(OWNER_ID).await.unwrap();
    let keys: Vec<_> = editions
        .iter()
        .map(|e| (e.product_id.as_str(), e.edition_number, e.edition_total))
        .collect();
    assert_eq!(
        keys,
        vec![("A", 7, None), ("P", 1, Some(25)), ("P", 2, Some(25))]
    );
}

#[tokio::test]
async fn test_unknown_owner_has_no_editions() {
    let h = harness().await;
    paid_order(&h, "1001", "#1001").await;
    assert!(
        h.ledger
            .get_valid_editions_for("nobody@example.com")
            .await
            .unwrap()
            .is_empty()
    );
}
