// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collapse order rows that stand for the same purchase.
//!
//! A hand-keyed row and the platform-synced row for the same sale share a
//! human-facing name. Exactly one row per name survives, so a purchase can
//! never show up as two editions.

use std::collections::HashMap;

use folio_core::Order;

use crate::validity::order_is_cancelled;

/// Grouping key for an order: the leading digits of its name without `#`,
/// else the lowercased name, else the order id.
pub fn canonical_key(order: &Order) -> String {
    let name = order.order_name.trim();
    let bare = name.trim_start_matches('#').trim_start();
    let digits: String = bare.chars().take_while(|c| c.is_ascii_digit()).collect();
    if !digits.is_empty() {
        return digits;
    }
    if !name.is_empty() {
        return name.to_lowercase();
    }
    order.order_id.clone()
}

/// True when `candidate` should replace the current winner of its group.
///
/// Live beats cancelled, then platform beats manual. Full ties keep the
/// current (first-seen) winner.
fn outranks(candidate: &Order, current: &Order) -> bool {
    let rank = |o: &Order| (!order_is_cancelled(o), !o.is_manual());
    rank(candidate) > rank(current)
}

/// One order per canonical key, in first-seen key order.
pub fn dedupe(orders: &[Order]) -> Vec<Order> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut winners: Vec<&Order> = Vec::new();
    for order in orders {
        let key = canonical_key(order);
        match slots.get(&key) {
            Some(&idx) => {
                if outranks(order, winners[idx]) {
                    winners[idx] = order;
                }
            }
            None => {
                slots.insert(key, winners.len());
                winners.push(order);
            }
        }
    }
    winners.into_iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::OrderSource;
    use folio_test_utils::fixtures::order;
    use proptest::prelude::*;

    fn manual_cancelled(name: &str) -> Order {
        let mut o = order(&format!("manual-{name}"), name);
        o.source = OrderSource::Manual;
        o.fulfillment_status = Some("canceled".into());
        o
    }

    #[test]
    fn canonical_key_forms() {
        assert_eq!(canonical_key(&order("1", "#1114")), "1114");
        assert_eq!(canonical_key(&order("2", "1114")), "1114");
        assert_eq!(canonical_key(&order("3", "#1114-R")), "1114");
        assert_eq!(canonical_key(&order("4", "Gift Order")), "gift order");
        assert_eq!(canonical_key(&order("5", "  ")), "5");
    }

    #[test]
    fn platform_row_beats_cancelled_manual_row() {
        let manual = manual_cancelled("#1114");
        let platform = order("5501", "#1114");
        let result = dedupe(&[manual.clone(), platform.clone()]);
        assert_eq!(result, vec![platform.clone()]);
        let result = dedupe(&[platform.clone(), manual]);
        assert_eq!(result, vec![platform]);
    }

    #[test]
    fn platform_beats_manual_when_both_live() {
        let mut manual = order("manual-7", "7");
        manual.source = OrderSource::Manual;
        let platform = order("77", "#7");
        assert_eq!(dedupe(&[manual, platform.clone()]), vec![platform]);
    }

    #[test]
    fn full_tie_keeps_first_seen() {
        let first = order("1", "#9");
        let second = order("2", "#9");
        assert_eq!(dedupe(&[first.clone(), second]), vec![first]);
    }

    #[test]
    fn distinct_keys_keep_input_order() {
        let a = order("1", "#2");
        let b = order("2", "#1");
        assert_eq!(dedupe(&[a.clone(), b.clone()]), vec![a, b]);
    }

    proptest! {
        #[test]
        fn live_row_wins_regardless_of_position(extra in 0usize..4, pos in 0usize..5) {
            let live = order("live", "#500");
            let mut rows: Vec<Order> = (0..extra)
                .map(|i| {
                    let mut o = order(&format!("dead-{i}"), "#500");
                    o.financial_status = Some("voided".into());
                    o
                })
                .collect();
            rows.insert(pos.min(rows.len()), live.clone());
            prop_assert_eq!(dedupe(&rows), vec![live]);
        }
    }
}
