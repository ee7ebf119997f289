// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping between SQLite rows and the domain types in `folio-core`.
//!
//! Timestamps are stored as RFC 3339 strings in UTC with millisecond
//! precision, so lexical and chronological order agree.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use rusqlite::types::Type;

use folio_core::{
    EditionEvent, EditionEventType, LineItem, LineItemStatus, Order, OrderSource, Product,
    RefundStatus,
};

/// Columns selected for an [`Order`], in mapping order.
pub const ORDER_COLUMNS: &str = "order_id, order_name, order_number, financial_status, \
     fulfillment_status, cancelled_at, archived, source, customer_id, customer_email, \
     created_at, updated_at";

/// Columns selected for a [`LineItem`], in mapping order.
pub const LINE_ITEM_COLUMNS: &str = "line_item_id, order_id, product_id, title, edition_number, \
     edition_total, status, restocked, refund_status, owner_id, owner_email, owner_name, \
     certificate_access_token, nfc_tag_id, nfc_claimed_at, created_at";

/// Number of columns in [`LINE_ITEM_COLUMNS`].
pub const LINE_ITEM_WIDTH: usize = 16;

/// Columns selected for an [`EditionEvent`], in mapping order.
pub const EVENT_COLUMNS: &str = "id, line_item_id, product_id, edition_number, event_type, \
     event_data, owner_id, owner_email, owner_name, status, created_at, created_by";

/// Prefix every column in `columns` with `alias.`.
pub fn qualified(alias: &str, columns: &str) -> String {
    columns
        .split(',')
        .map(|c| format!("{alias}.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format a timestamp for storage.
pub fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, msg.into())
}

fn get_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, format!("bad timestamp {raw:?}: {e}")))
}

fn get_opt_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        None => Ok(None),
        Some(_) => get_ts(row, idx).map(Some),
    }
}

fn get_enum<T>(row: &Row<'_>, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| conversion_error(idx, format!("unknown value {raw:?}")))
}

pub fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        product_id: row.get(0)?,
        title: row.get(1)?,
        edition_size: row.get(2)?,
    })
}

/// Map an order starting at column `base`.
pub fn order_from_row(row: &Row<'_>, base: usize) -> rusqlite::Result<Order> {
    let archived: Option<i64> = row.get(base + 6)?;
    Ok(Order {
        order_id: row.get(base)?,
        order_name: row.get(base + 1)?,
        order_number: row.get(base + 2)?,
        financial_status: row.get(base + 3)?,
        fulfillment_status: row.get(base + 4)?,
        cancelled_at: get_opt_ts(row, base + 5)?,
        archived: archived.map(|v| v != 0),
        source: get_enum(row, base + 7, OrderSource::parse)?,
        customer_id: row.get(base + 8)?,
        customer_email: row.get(base + 9)?,
        created_at: get_ts(row, base + 10)?,
        updated_at: get_ts(row, base + 11)?,
    })
}

/// Map a line item starting at column `base`.
pub fn line_item_from_row(row: &Row<'_>, base: usize) -> rusqlite::Result<LineItem> {
    let refund: Option<String> = row.get(base + 8)?;
    let refund_status = match refund {
        None => None,
        Some(raw) => Some(
            RefundStatus::parse(&raw)
                .ok_or_else(|| conversion_error(base + 8, format!("unknown value {raw:?}")))?,
        ),
    };
    Ok(LineItem {
        line_item_id: row.get(base)?,
        order_id: row.get(base + 1)?,
        product_id: row.get(base + 2)?,
        title: row.get(base + 3)?,
        edition_number: row.get(base + 4)?,
        edition_total: row.get(base + 5)?,
        status: get_enum(row, base + 6, LineItemStatus::parse)?,
        restocked: row.get::<_, i64>(base + 7)? != 0,
        refund_status,
        owner_id: row.get(base + 9)?,
        owner_email: row.get(base + 10)?,
        owner_name: row.get(base + 11)?,
        certificate_access_token: row.get(base + 12)?,
        nfc_tag_id: row.get(base + 13)?,
        nfc_claimed_at: get_opt_ts(row, base + 14)?,
        created_at: get_ts(row, base + 15)?,
    })
}

pub fn event_from_row(row: &Row<'_>) -> rusqlite::Result<EditionEvent> {
    let raw_data: String = row.get(5)?;
    let event_data = serde_json::from_str(&raw_data)
        .map_err(|e| conversion_error(5, format!("bad event_data: {e}")))?;
    Ok(EditionEvent {
        id: row.get(0)?,
        line_item_id: row.get(1)?,
        product_id: row.get(2)?,
        edition_number: row.get(3)?,
        event_type: get_enum(row, 4, EditionEventType::parse)?,
        event_data,
        owner_id: row.get(6)?,
        owner_email: row.get(7)?,
        owner_name: row.get(8)?,
        status: get_enum(row, 9, LineItemStatus::parse)?,
        created_at: get_ts(row, 10)?,
        created_by: row.get(11)?,
    })
}
