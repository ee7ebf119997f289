// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Line item reads, flag updates and the edition numbering writes.

use folio_core::{
    EditionEvent, FlagChange, FolioError, LedgerEntry, LineItem, NumberingPlan,
};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::database::Database;
use crate::models::{
    LINE_ITEM_COLUMNS, LINE_ITEM_WIDTH, ORDER_COLUMNS, line_item_from_row, order_from_row,
    qualified, ts,
};
use crate::queries::events::insert_event;

/// Insert a new line item.
pub async fn insert_line_item(db: &Database, item: &LineItem) -> Result<(), FolioError> {
    let item = item.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO line_items ({LINE_ITEM_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
                ),
                params![
                    item.line_item_id,
                    item.order_id,
                    item.product_id,
                    item.title,
                    item.edition_number,
                    item.edition_total,
                    item.status.as_str(),
                    item.restocked,
                    item.refund_status.map(|r| r.as_str()),
                    item.owner_id,
                    item.owner_email,
                    item.owner_name,
                    item.certificate_access_token,
                    item.nfc_tag_id,
                    item.nfc_claimed_at.as_ref().map(ts),
                    ts(&item.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_line_item(
    db: &Database,
    line_item_id: &str,
) -> Result<Option<LineItem>, FolioError> {
    let line_item_id = line_item_id.to_string();
    db.connection()
        .call(move |conn| {
            let item = conn
                .query_row(
                    &format!("SELECT {LINE_ITEM_COLUMNS} FROM line_items WHERE line_item_id = ?1"),
                    params![line_item_id],
                    |row| line_item_from_row(row, 0),
                )
                .optional()?;
            Ok(item)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn line_items_for_order(
    db: &Database,
    order_id: &str,
) -> Result<Vec<LineItem>, FolioError> {
    let order_id = order_id.to_string();
    db.connection()
        .call(move |conn| {
            select_line_items(conn, "WHERE order_id = ?1 ORDER BY rowid ASC", params![order_id])
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Line items owned by `owner`, matched on owner id or case-insensitive email.
pub async fn line_items_for_owner(db: &Database, owner: &str) -> Result<Vec<LineItem>, FolioError> {
    let owner = owner.to_string();
    db.connection()
        .call(move |conn| {
            select_line_items(
                conn,
                "WHERE owner_id = ?1 OR lower(owner_email) = lower(?1) ORDER BY rowid ASC",
                params![owner],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Every line item of a product joined with its order, in insertion order.
pub async fn product_ledger(
    db: &Database,
    product_id: &str,
) -> Result<Vec<LedgerEntry>, FolioError> {
    let product_id = product_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {}, {} FROM line_items li
                 JOIN orders o ON o.order_id = li.order_id
                 WHERE li.product_id = ?1
                 ORDER BY li.rowid ASC",
                qualified("li", LINE_ITEM_COLUMNS),
                qualified("o", ORDER_COLUMNS),
            ))?;
            let rows = stmt.query_map(params![product_id], |row| {
                Ok(LedgerEntry {
                    item: line_item_from_row(row, 0)?,
                    order: order_from_row(row, LINE_ITEM_WIDTH)?,
                })
            })?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?);
            }
            Ok(entries)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn product_ids(db: &Database) -> Result<Vec<String>, FolioError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT product_id FROM line_items
                 WHERE product_id IS NOT NULL ORDER BY product_id ASC",
            )?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut ids = Vec::new();
            for row in rows {
                ids.push(row?);
            }
            Ok(ids)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Flip flags, clear the edition number and append `event` in one transaction.
pub async fn invalidate_line_item(
    db: &Database,
    line_item_id: &str,
    change: &FlagChange,
    event: &EditionEvent,
) -> Result<(), FolioError> {
    let id = line_item_id.to_string();
    let change = change.clone();
    let event = event.clone();
    let updated = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let updated = write_flags(&tx, &id, &change)?;
            if updated == 0 {
                return Ok(0);
            }
            insert_event(&tx, &event)?;
            tx.commit()?;
            Ok(updated)
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    if updated == 0 {
        return Err(FolioError::not_found("line item", line_item_id));
    }
    Ok(())
}

/// Apply a numbering plan and append its events in one transaction.
///
/// Numbers on the changed rows are cleared before any is set, so swapping
/// two numbers never trips the per-product uniqueness index.
pub async fn apply_numbering(db: &Database, plan: &NumberingPlan) -> Result<(), FolioError> {
    if plan.is_empty() {
        return Ok(());
    }
    let plan = plan.clone();
    let product_id = plan.product_id.clone();
    let missing = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut clear = tx.prepare(
                    "UPDATE line_items SET edition_number = NULL
                     WHERE line_item_id = ?1 AND product_id = ?2",
                )?;
                for change in &plan.changes {
                    clear.execute(params![change.line_item_id, plan.product_id])?;
                }

                let mut set = tx.prepare(
                    "UPDATE line_items SET
                         edition_number = ?1,
                         edition_total = COALESCE(?2, edition_total)
                     WHERE line_item_id = ?3 AND product_id = ?4",
                )?;
                for change in &plan.changes {
                    let updated = set.execute(params![
                        change.edition_number,
                        change.edition_total,
                        change.line_item_id,
                        plan.product_id,
                    ])?;
                    if updated == 0 {
                        return Ok(Some(change.line_item_id.clone()));
                    }
                }
            }
            for event in &plan.events {
                insert_event(&tx, event)?;
            }
            tx.commit()?;
            Ok(None)
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    if let Some(line_item_id) = missing {
        return Err(FolioError::not_found("line item", line_item_id));
    }
    debug!(product_id = %product_id, "numbering plan applied");
    Ok(())
}

/// Set the flags named in `change` and clear the edition number.
fn write_flags(
    conn: &Connection,
    line_item_id: &str,
    change: &FlagChange,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE line_items SET
             status = COALESCE(?1, status),
             restocked = COALESCE(?2, restocked),
             refund_status = COALESCE(?3, refund_status),
             edition_number = NULL
         WHERE line_item_id = ?4",
        params![
            change.status.map(|s| s.as_str()),
            change.restocked,
            change.refund_status.map(|r| r.as_str()),
            line_item_id,
        ],
    )
}

fn select_line_items(
    conn: &Connection,
    clause: &str,
    params: impl rusqlite::Params,
) -> rusqlite::Result<Vec<LineItem>> {
    let mut stmt = conn.prepare(&format!("SELECT {LINE_ITEM_COLUMNS} FROM line_items {clause}"))?;
    let rows = stmt.query_map(params, |row| line_item_from_row(row, 0))?;
    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}
