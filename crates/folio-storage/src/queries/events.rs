// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only edition event log.
//!
//! Rows are only ever inserted. Triggers in the schema abort any UPDATE or
//! DELETE against `edition_events`.

use folio_core::{EditionEvent, FolioError};
use rusqlite::{Connection, params};

use crate::database::Database;
use crate::models::{EVENT_COLUMNS, event_from_row, ts};

/// Insert one event on an open connection or transaction and return its row id.
pub(crate) fn insert_event(conn: &Connection, event: &EditionEvent) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO edition_events (line_item_id, product_id, edition_number, event_type,
             event_data, owner_id, owner_email, owner_name, status, created_at, created_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            event.line_item_id,
            event.product_id,
            event.edition_number,
            event.event_type.as_str(),
            event.event_data.to_string(),
            event.owner_id,
            event.owner_email,
            event.owner_name,
            event.status.as_str(),
            ts(&event.created_at),
            event.created_by,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Append a single event.
pub async fn record(db: &Database, event: &EditionEvent) -> Result<i64, FolioError> {
    let event = event.clone();
    db.connection()
        .call(move |conn| insert_event(conn, &event))
        .await
        .map_err(crate::database::map_tr_err)
}

/// Append many events in one transaction.
pub async fn record_batch(db: &Database, events: &[EditionEvent]) -> Result<usize, FolioError> {
    let events = events.to_vec();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            for event in &events {
                insert_event(&tx, event)?;
            }
            tx.commit()?;
            Ok(events.len())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Events for a product in insertion order.
pub async fn events_for_product(
    db: &Database,
    product_id: &str,
) -> Result<Vec<EditionEvent>, FolioError> {
    select_events(db, "product_id", product_id).await
}

/// Events for a line item in insertion order.
pub async fn events_for_line_item(
    db: &Database,
    line_item_id: &str,
) -> Result<Vec<EditionEvent>, FolioError> {
    select_events(db, "line_item_id", line_item_id).await
}

async fn select_events(
    db: &Database,
    column: &'static str,
    value: &str,
) -> Result<Vec<EditionEvent>, FolioError> {
    let value = value.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM edition_events WHERE {column} = ?1 ORDER BY id ASC"
            ))?;
            let rows = stmt.query_map(params![value], event_from_row)?;
            let mut events = Vec::new();
            for row in rows {
                events.push(row?);
            }
            Ok(events)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
