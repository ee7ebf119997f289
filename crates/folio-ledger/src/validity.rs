// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Validity state machine for line items.
//!
//! A line item is valid for the ledger only when every one of its own flags
//! and its order's status fields allow it. The checks form a conjunction, so
//! the first failing check is reported purely for diagnostics.

use folio_core::{LineItem, LineItemStatus, Order, RefundStatus};
use serde::Serialize;

/// Order fulfillment statuses that void every item on the order.
const VOID_FULFILLMENT: &[&str] = &["restocked", "canceled", "cancelled"];

/// Order financial statuses that void every item on the order.
const VOID_FINANCIAL: &[&str] = &["refunded", "voided"];

/// Why a line item is excluded from numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidCause {
    ItemRemoved,
    ItemRestocked,
    ItemRefunded,
    OrderFulfillmentVoid,
    OrderFinancialVoid,
}

impl InvalidCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidCause::ItemRemoved => "item_removed",
            InvalidCause::ItemRestocked => "item_restocked",
            InvalidCause::ItemRefunded => "item_refunded",
            InvalidCause::OrderFulfillmentVoid => "order_fulfillment_void",
            InvalidCause::OrderFinancialVoid => "order_financial_void",
        }
    }
}

/// Ledger classification of a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Valid,
    Invalid(InvalidCause),
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validity::Valid)
    }
}

/// Classify `item` under its parent `order`.
pub fn classify(item: &LineItem, order: &Order) -> Validity {
    if item.status == LineItemStatus::Removed {
        return Validity::Invalid(InvalidCause::ItemRemoved);
    }
    if item.restocked {
        return Validity::Invalid(InvalidCause::ItemRestocked);
    }
    if item.refund_status == Some(RefundStatus::Refunded) {
        return Validity::Invalid(InvalidCause::ItemRefunded);
    }
    if order_fulfillment_void(order) {
        return Validity::Invalid(InvalidCause::OrderFulfillmentVoid);
    }
    if order_financial_void(order) {
        return Validity::Invalid(InvalidCause::OrderFinancialVoid);
    }
    Validity::Valid
}

pub fn is_valid(item: &LineItem, order: &Order) -> bool {
    classify(item, order).is_valid()
}

/// Eligible to hold an edition number: valid and tied to a product.
pub fn is_numberable(item: &LineItem, order: &Order) -> bool {
    item.product_id.is_some() && is_valid(item, order)
}

/// True when the order's own status fields cancel it.
pub fn order_is_cancelled(order: &Order) -> bool {
    order_fulfillment_void(order) || order_financial_void(order)
}

/// Financial status alone marks the order cancelled (voided or refunded).
pub fn financial_cancelled(financial: Option<&str>) -> bool {
    financial.is_some_and(|f| VOID_FINANCIAL.contains(&f))
}

fn order_fulfillment_void(order: &Order) -> bool {
    order
        .fulfillment()
        .is_some_and(|f| VOID_FULFILLMENT.contains(&f.as_str()))
}

fn order_financial_void(order: &Order) -> bool {
    financial_cancelled(order.financial().as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use folio_core::OrderSource;

    fn order() -> Order {
        let now = Utc::now();
        Order {
            order_id: "1".into(),
            order_name: "#1".into(),
            order_number: Some(1),
            financial_status: Some("paid".into()),
            fulfillment_status: Some("fulfilled".into()),
            cancelled_at: None,
            archived: None,
            source: OrderSource::Platform,
            customer_id: None,
            customer_email: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn item() -> LineItem {
        LineItem {
            line_item_id: "li".into(),
            order_id: "1".into(),
            product_id: Some("P".into()),
            title: None,
            edition_number: None,
            edition_total: None,
            status: LineItemStatus::Active,
            restocked: false,
            refund_status: None,
            owner_id: None,
            owner_email: None,
            owner_name: None,
            certificate_access_token: None,
            nfc_tag_id: None,
            nfc_claimed_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn clean_item_is_valid() {
        assert_eq!(classify(&item(), &order()), Validity::Valid);
        let mut i = item();
        i.refund_status = Some(RefundStatus::None);
        assert!(is_valid(&i, &order()));
    }

    #[test]
    fn each_item_flag_invalidates() {
        let o = order();
        let mut removed = item();
        removed.status = LineItemStatus::Removed;
        assert_eq!(
            classify(&removed, &o),
            Validity::Invalid(InvalidCause::ItemRemoved)
        );

        let mut restocked = item();
        restocked.restocked = true;
        assert_eq!(
            classify(&restocked, &o),
            Validity::Invalid(InvalidCause::ItemRestocked)
        );

        let mut refunded = item();
        refunded.refund_status = Some(RefundStatus::Refunded);
        assert_eq!(
            classify(&refunded, &o),
            Validity::Invalid(InvalidCause::ItemRefunded)
        );
    }

    #[test]
    fn order_statuses_invalidate_case_insensitively() {
        for fulfillment in ["restocked", "Canceled", "cancelled"] {
            let mut o = order();
            o.fulfillment_status = Some(fulfillment.into());
            assert!(!is_valid(&item(), &o), "{fulfillment}");
            assert!(order_is_cancelled(&o));
        }
        for financial in ["refunded", "VOIDED"] {
            let mut o = order();
            o.financial_status = Some(financial.into());
            assert!(!is_valid(&item(), &o), "{financial}");
        }
        let mut partial = order();
        partial.financial_status = Some("partially_refunded".into());
        assert!(is_valid(&item(), &partial));
    }

    #[test]
    fn item_without_product_is_valid_but_not_numberable() {
        let mut accessory = item();
        accessory.product_id = None;
        assert!(is_valid(&accessory, &order()));
        assert!(!is_numberable(&accessory, &order()));
    }
}
