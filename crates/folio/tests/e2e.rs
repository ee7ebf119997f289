// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the edition ledger.
//!
//! Each test creates an isolated TestHarness with a temp SQLite store and a
//! mock platform. Tests are independent and order-insensitive.

use std::sync::Arc;

use folio_core::{EditionEventType, LineItemStatus, PurchaseStore};
use folio_ledger::{InvalidationReason, LedgerSettings, dedupe};
use folio_test_utils::TestHarness;
use folio_test_utils::fixtures::{line_item, numbered, order};

async fn harness() -> TestHarness {
    TestHarness::builder()
        .with_product("P", Some(10))
        .with_product("Q", Some(5))
        .build()
        .await
        .unwrap()
}

/// Valid items of `product_id` hold exactly 1..=k; invalid ones hold nothing.
async fn assert_dense(harness: &TestHarness, product_id: &str) {
    let entries = harness.store.product_ledger(product_id).await.unwrap();
    let mut numbers: Vec<u32> = Vec::new();
    for entry in &entries {
        let valid = folio_ledger::classify(&entry.item, &entry.order).is_valid();
        match (valid, entry.item.edition_number) {
            (true, Some(n)) => numbers.push(n),
            (false, None) => {}
            (valid, number) => panic!(
                "{} valid={valid} number={number:?}",
                entry.item.line_item_id
            ),
        }
    }
    numbers.sort_unstable();
    let expected: Vec<u32> = (1..=numbers.len() as u32).collect();
    assert_eq!(numbers, expected);
}

// ---- Numbering lifecycle ----

#[tokio::test]
async fn test_invalidation_closes_gap_and_new_sale_takes_next_number() {
    let harness = harness().await;
    let o = order("1001", "#1001");
    harness.insert_order(&o).await.unwrap();
    for (id, minutes) in [("t1", 1), ("t2", 2), ("t3", 3)] {
        harness.insert_item(&line_item(id, &o, "P", minutes)).await.unwrap();
    }

    harness.ledger.resequence("P").await.unwrap();
    assert_eq!(
        harness.numbers("P").await.unwrap(),
        numbered(&[("t1", Some(1)), ("t2", Some(2)), ("t3", Some(3))])
    );

    let outcome = harness
        .ledger
        .mark_invalid("t2", InvalidationReason::Removed)
        .await
        .unwrap();
    assert_eq!(outcome.cleared_number, Some(2));
    assert_eq!(
        harness.numbers("P").await.unwrap(),
        numbered(&[("t1", Some(1)), ("t2", None), ("t3", Some(2))])
    );

    harness.insert_item(&line_item("t4", &o, "P", 4)).await.unwrap();
    harness.ledger.resequence("P").await.unwrap();
    assert_eq!(
        harness.numbers("P").await.unwrap(),
        numbered(&[("t1", Some(1)), ("t2", None), ("t3", Some(2)), ("t4", Some(3))])
    );
    let removed = harness.store.get_line_item("t2").await.unwrap().unwrap();
    assert_eq!(removed.status, LineItemStatus::Removed);
}

#[tokio::test]
async fn test_second_resequence_writes_nothing() {
    let harness = harness().await;
    let o = order("1001", "#1001");
    harness.insert_order(&o).await.unwrap();
    harness.insert_item(&line_item("a", &o, "P", 0)).await.unwrap();
    harness.insert_item(&line_item("b", &o, "P", 1)).await.unwrap();

    harness.ledger.resequence("P").await.unwrap();
    let events_before = harness.ledger.audit().history_for_product("P").await.unwrap();
    let calls_before = harness.flaky.numbering_calls();

    let again = harness.ledger.resequence("P").await.unwrap();
    assert!(again.is_noop());
    assert_eq!(harness.flaky.numbering_calls(), calls_before);
    assert_eq!(
        harness.ledger.audit().history_for_product("P").await.unwrap(),
        events_before
    );
}

#[tokio::test]
async fn test_concurrent_invalidations_keep_numbering_dense() {
    let harness = harness().await;
    let o = order("1001", "#1001");
    harness.insert_order(&o).await.unwrap();
    for i in 0..20 {
        harness
            .insert_item(&line_item(&format!("li-{i:02}"), &o, "P", i))
            .await
            .unwrap();
    }
    harness.ledger.resequence("P").await.unwrap();

    let mut invalidations = Vec::new();
    let mut resequences = Vec::new();
    for i in (0..20).step_by(3) {
        let ledger = Arc::clone(&harness.ledger);
        invalidations.push(tokio::spawn(async move {
            ledger
                .mark_invalid(&format!("li-{i:02}"), InvalidationReason::Refunded)
                .await
        }));
        let ledger = Arc::clone(&harness.ledger);
        resequences.push(tokio::spawn(async move { ledger.resequence("P").await }));
    }
    for task in invalidations {
        task.await.unwrap().unwrap();
    }
    for task in resequences {
        task.await.unwrap().unwrap();
    }

    assert_dense(&harness, "P").await;
    assert_eq!(harness.ledger.locks().active(), 0);
}

// ---- Storage failures ----

#[tokio::test]
async fn test_transient_write_failures_are_retried() {
    let harness = TestHarness::builder()
        .with_product("P", Some(10))
        .with_numbering_failures(2)
        .build()
        .await
        .unwrap();
    let o = order("1001", "#1001");
    harness.insert_order(&o).await.unwrap();
    harness.insert_item(&line_item("a", &o, "P", 0)).await.unwrap();

    harness.ledger.resequence("P").await.unwrap();
    assert_eq!(harness.flaky.numbering_calls(), 3);
    assert_eq!(harness.numbers("P").await.unwrap(), numbered(&[("a", Some(1))]));
}

#[tokio::test]
async fn test_exhausted_retries_leave_numbering_untouched() {
    let harness = TestHarness::builder()
        .with_product("P", Some(10))
        .with_numbering_failures(10)
        .with_settings(LedgerSettings {
            resequence_attempts: 2,
            ..LedgerSettings::default()
        })
        .build()
        .await
        .unwrap();
    let o = order("1001", "#1001");
    harness.insert_order(&o).await.unwrap();
    harness.insert_item(&line_item("a", &o, "P", 0)).await.unwrap();

    assert!(harness.ledger.resequence("P").await.is_err());
    assert_eq!(harness.flaky.numbering_calls(), 2);
    assert_eq!(harness.numbers("P").await.unwrap(), numbered(&[("a", None)]));
    assert!(
        harness
            .ledger
            .audit()
            .history_for_product("P")
            .await
            .unwrap()
            .is_empty()
    );
}

// ---- Audit ----

#[tokio::test]
async fn test_every_transition_is_audited_and_history_is_immutable() {
    let harness = harness().await;
    let o = order("1001", "#1001");
    harness.insert_order(&o).await.unwrap();
    for i in 0..4 {
        harness
            .insert_item(&line_item(&format!("p{i}"), &o, "P", i))
            .await
            .unwrap();
    }
    harness.insert_item(&line_item("q0", &o, "Q", 0)).await.unwrap();

    harness.ledger.resequence("P").await.unwrap();
    harness
        .ledger
        .mark_invalid("p1", InvalidationReason::Restocked)
        .await
        .unwrap();
    harness
        .ledger
        .mark_invalid("p3", InvalidationReason::Removed)
        .await
        .unwrap();
    let transitions = 2;

    let snapshot = harness.ledger.audit().history_for_product("P").await.unwrap();
    assert!(snapshot.len() >= transitions);
    let cleared = snapshot
        .iter()
        .filter(|e| e.event_type == EditionEventType::StatusChanged)
        .count();
    assert!(cleared >= transitions);

    harness.ledger.resequence("Q").await.unwrap();
    harness.ledger.verify_all().await.unwrap();
    harness.ledger.resequence("P").await.unwrap();

    let after = harness.ledger.audit().history_for_product("P").await.unwrap();
    assert_eq!(after, snapshot);
}

// ---- Integrity ----

#[tokio::test]
async fn test_verify_heals_gap_and_records_violation() {
    let harness = harness().await;
    let o = order("1001", "#1001");
    harness.insert_order(&o).await.unwrap();
    let mut first = line_item("a", &o, "P", 0);
    first.edition_number = Some(1);
    let mut gapped = line_item("b", &o, "P", 1);
    gapped.edition_number = Some(3);
    harness.insert_item(&first).await.unwrap();
    harness.insert_item(&gapped).await.unwrap();

    let report = harness.ledger.verify("P").await.unwrap();
    assert!(!report.is_clean());
    assert!(report.healed.is_some());
    assert_eq!(
        harness.numbers("P").await.unwrap(),
        numbered(&[("a", Some(1)), ("b", Some(2))])
    );
    let history = harness.ledger.audit().history_for_line_item("b").await.unwrap();
    assert!(
        history
            .iter()
            .any(|e| e.event_type == EditionEventType::IntegrityViolation)
    );

    let clean = harness.ledger.verify("P").await.unwrap();
    assert!(clean.is_clean());
    assert!(clean.healed.is_none());
}

// ---- Deduplication ----

#[tokio::test]
async fn test_manual_cancelled_duplicate_loses_to_platform_row() {
    let harness = harness().await;
    let mut manual = order("manual-1114", "#1114");
    manual.fulfillment_status = Some("canceled".into());
    let platform = order("5501", "#1114");
    harness.insert_order(&manual).await.unwrap();
    harness.insert_order(&platform).await.unwrap();

    let stored = harness.store.find_orders_by_number("1114").await.unwrap();
    assert_eq!(stored.len(), 2);
    let winners = dedupe(&stored);
    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0].order_id, "5501");

    let mut reversed = stored.clone();
    reversed.reverse();
    assert_eq!(dedupe(&reversed)[0].order_id, "5501");
}

#[tokio::test]
async fn test_owner_sees_one_edition_per_purchase() {
    let harness = harness().await;
    let manual = order("manual-1114", "1114");
    let platform = order("5501", "#1114");
    harness.insert_order(&manual).await.unwrap();
    harness.insert_order(&platform).await.unwrap();
    harness.insert_item(&line_item("li-manual", &manual, "P", 0)).await.unwrap();
    harness.insert_item(&line_item("li-platform", &platform, "P", 1)).await.unwrap();
    harness.ledger.resequence("P").await.unwrap();

    let editions = harness
        .ledger
        .get_valid_editions_for("owner@example.com")
        .await
        .unwrap();
    assert_eq!(editions.len(), 1);
    assert_eq!(editions[0].line_item_id, "li-platform");
    assert_eq!(editions[0].edition_total, Some(10));
}
