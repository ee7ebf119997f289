// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Order CRUD operations.

use chrono::Utc;
use folio_core::{EditionEvent, FolioError, Order, OrderCorrection};
use rusqlite::{Connection, OptionalExtension, params};

use crate::database::Database;
use crate::models::{ORDER_COLUMNS, order_from_row, ts};
use crate::queries::events::insert_event;

/// Insert a new order.
pub async fn insert_order(db: &Database, order: &Order) -> Result<(), FolioError> {
    let order = order.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO orders ({ORDER_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
                ),
                params![
                    order.order_id,
                    order.order_name,
                    order.order_number,
                    order.financial_status,
                    order.fulfillment_status,
                    order.cancelled_at.as_ref().map(ts),
                    order.archived,
                    order.source.as_str(),
                    order.customer_id,
                    order.customer_email,
                    ts(&order.created_at),
                    ts(&order.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_order(db: &Database, order_id: &str) -> Result<Option<Order>, FolioError> {
    let order_id = order_id.to_string();
    db.connection()
        .call(move |conn| {
            let order = conn
                .query_row(
                    &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = ?1"),
                    params![order_id],
                    |row| order_from_row(row, 0),
                )
                .optional()?;
            Ok(order)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Orders matching `number` by name (`#1114` or `1114`) or numeric order number.
pub async fn find_orders_by_number(db: &Database, number: &str) -> Result<Vec<Order>, FolioError> {
    let bare = number.trim().trim_start_matches('#').to_string();
    let numeric: Option<i64> = bare.parse().ok();
    db.connection()
        .call(move |conn| {
            select_orders(
                conn,
                "WHERE order_name = ?1 OR order_name = '#' || ?1 OR order_number = ?2
                 ORDER BY created_at ASC, rowid ASC",
                params![bare, numeric],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Orders whose customer id matches, or whose email matches case-insensitively.
pub async fn find_orders_by_customer(
    db: &Database,
    customer: &str,
) -> Result<Vec<Order>, FolioError> {
    let customer = customer.to_string();
    db.connection()
        .call(move |conn| {
            select_orders(
                conn,
                "WHERE customer_id = ?1 OR lower(customer_email) = lower(?1)
                 ORDER BY created_at ASC, rowid ASC",
                params![customer],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Most recent orders first.
pub async fn list_orders(db: &Database, limit: usize) -> Result<Vec<Order>, FolioError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            select_orders(
                conn,
                "ORDER BY created_at DESC, rowid DESC LIMIT ?1",
                params![limit],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Overwrite status fields on an order and append `events` in one transaction.
///
/// Fails with [`FolioError::NotFound`] when the order does not exist.
pub async fn apply_order_correction(
    db: &Database,
    order_id: &str,
    correction: &OrderCorrection,
    events: &[EditionEvent],
) -> Result<(), FolioError> {
    let id = order_id.to_string();
    let correction = correction.clone();
    let events = events.to_vec();
    let found = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let (set_cancelled, cancelled_at) = match correction.cancelled_at {
                Some(value) => (true, value.as_ref().map(ts)),
                None => (false, None),
            };
            let updated = tx.execute(
                "UPDATE orders SET
                     financial_status = COALESCE(?1, financial_status),
                     fulfillment_status = COALESCE(?2, fulfillment_status),
                     cancelled_at = CASE WHEN ?3 THEN ?4 ELSE cancelled_at END,
                     archived = COALESCE(?5, archived),
                     updated_at = ?6
                 WHERE order_id = ?7",
                params![
                    correction.financial_status,
                    correction.fulfillment_status,
                    set_cancelled,
                    cancelled_at,
                    correction.archived,
                    ts(&Utc::now()),
                    id,
                ],
            )?;
            if updated == 0 {
                return Ok(false);
            }
            for event in &events {
                insert_event(&tx, event)?;
            }
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    if found {
        Ok(())
    } else {
        Err(FolioError::not_found("order", order_id))
    }
}

fn select_orders(
    conn: &Connection,
    clause: &str,
    params: impl rusqlite::Params,
) -> rusqlite::Result<Vec<Order>> {
    let mut stmt = conn.prepare(&format!("SELECT {ORDER_COLUMNS} FROM orders {clause}"))?;
    let rows = stmt.query_map(params, |row| order_from_row(row, 0))?;
    let mut orders = Vec::new();
    for row in rows {
        orders.push(row?);
    }
    Ok(orders)
}
