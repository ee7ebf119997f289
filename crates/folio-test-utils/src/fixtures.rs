// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record builders with paid, fulfilled, owned defaults.

use chrono::{DateTime, Duration, TimeZone, Utc};
use folio_core::{LedgerEntry, LineItem, LineItemStatus, Order, OrderSource, PlatformOrder};

pub const OWNER_ID: &str = "cust-1";
pub const OWNER_EMAIL: &str = "owner@example.com";

/// Fixed reference time; purchase times are offsets from it.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// A paid, fulfilled order owned by [`OWNER_ID`]. Ids starting with
/// `manual-` are marked as hand-keyed.
pub fn order(id: &str, name: &str) -> Order {
    Order {
        order_id: id.into(),
        order_name: name.into(),
        order_number: name.trim_start_matches('#').parse().ok(),
        financial_status: Some("paid".into()),
        fulfillment_status: Some("fulfilled".into()),
        cancelled_at: None,
        archived: None,
        source: if id.starts_with("manual-") {
            OrderSource::Manual
        } else {
            OrderSource::Platform
        },
        customer_id: Some(OWNER_ID.into()),
        customer_email: Some(OWNER_EMAIL.into()),
        created_at: base_time(),
        updated_at: base_time(),
    }
}

/// An active, unnumbered line item of `product_id`, purchased `minutes`
/// after [`base_time`].
pub fn line_item(id: &str, order: &Order, product_id: &str, minutes: i64) -> LineItem {
    LineItem {
        line_item_id: id.into(),
        order_id: order.order_id.clone(),
        product_id: Some(product_id.into()),
        title: Some(format!("Print {product_id}")),
        edition_number: None,
        edition_total: None,
        status: LineItemStatus::Active,
        restocked: false,
        refund_status: None,
        owner_id: order.customer_id.clone(),
        owner_email: order.customer_email.clone(),
        owner_name: Some("Owner".into()),
        certificate_access_token: Some(format!("cert-{id}")),
        nfc_tag_id: None,
        nfc_claimed_at: None,
        created_at: base_time() + Duration::minutes(minutes),
    }
}

/// Pair `item` with its parent order the way the store joins them.
pub fn entry(item: LineItem, order: &Order) -> LedgerEntry {
    LedgerEntry {
        item,
        order: order.clone(),
    }
}

/// Owned `(line_item_id, edition_number)` rows, for comparing against
/// [`TestHarness::numbers`](crate::TestHarness::numbers).
pub fn numbered(rows: &[(&str, Option<u32>)]) -> Vec<(String, Option<u32>)> {
    rows.iter().map(|(id, n)| (id.to_string(), *n)).collect()
}

/// The platform's view of a paid, fulfilled, open order.
pub fn platform_order(id: &str, name: &str) -> PlatformOrder {
    PlatformOrder {
        id: id.into(),
        name: name.into(),
        order_number: name.trim_start_matches('#').parse().ok(),
        financial_status: Some("paid".into()),
        fulfillment_status: Some("fulfilled".into()),
        cancelled_at: None,
        closed_at: None,
        status: None,
        tags: String::new(),
    }
}
