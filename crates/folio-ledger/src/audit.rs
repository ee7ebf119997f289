// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audit event construction and the append-only log handle.

use std::sync::Arc;

use folio_core::{AuditSink, EditionEvent, EditionEventType, FolioError, LineItem};
use serde_json::json;
use tracing::debug;

/// Handle to the append-only edition event log.
#[derive(Clone)]
pub struct AuditLog {
    sink: Arc<dyn AuditSink>,
}

impl AuditLog {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Append one event.
    pub async fn record(&self, event: &EditionEvent) -> Result<i64, FolioError> {
        let id = self.sink.record(event).await?;
        debug!(
            id,
            line_item_id = %event.line_item_id,
            event_type = event.event_type.as_str(),
            "audit event recorded"
        );
        Ok(id)
    }

    /// Append events in one batch. An empty slice writes nothing.
    pub async fn record_all(&self, events: &[EditionEvent]) -> Result<usize, FolioError> {
        if events.is_empty() {
            return Ok(0);
        }
        let written = self.sink.record_batch(events).await?;
        debug!(written, "audit batch recorded");
        Ok(written)
    }

    pub async fn history_for_product(
        &self,
        product_id: &str,
    ) -> Result<Vec<EditionEvent>, FolioError> {
        self.sink.events_for_product(product_id).await
    }

    pub async fn history_for_line_item(
        &self,
        line_item_id: &str,
    ) -> Result<Vec<EditionEvent>, FolioError> {
        self.sink.events_for_line_item(line_item_id).await
    }
}

/// A number given to an item that had none, or a changed number.
pub fn numbered(item: &LineItem, new: u32, reason: &str, actor: &str) -> EditionEvent {
    let event_type = match item.edition_number {
        None => EditionEventType::Assigned,
        Some(_) => EditionEventType::Resequenced,
    };
    EditionEvent::for_item(
        item,
        event_type,
        Some(new),
        json!({ "previous": item.edition_number, "new": new, "reason": reason }),
        actor,
    )
}

/// A number taken away from an item. `edition_number` records the cleared value.
pub fn cleared(item: &LineItem, reason: &str, cause: &str, actor: &str) -> EditionEvent {
    EditionEvent::for_item(
        item,
        EditionEventType::StatusChanged,
        item.edition_number,
        json!({ "previous": item.edition_number, "new": null, "reason": reason, "cause": cause }),
        actor,
    )
}

/// Validity flipped without the number itself being written here.
pub fn validity_changed(
    item: &LineItem,
    valid: bool,
    reason: &str,
    detail: serde_json::Value,
    actor: &str,
) -> EditionEvent {
    EditionEvent::for_item(
        item,
        EditionEventType::StatusChanged,
        item.edition_number,
        json!({ "valid": valid, "reason": reason, "detail": detail }),
        actor,
    )
}

/// Detected duplicate, gap or stray number.
pub fn integrity_violation(item: &LineItem, kind: &str, detail: &str, actor: &str) -> EditionEvent {
    EditionEvent::for_item(
        item,
        EditionEventType::IntegrityViolation,
        item.edition_number,
        json!({ "kind": kind, "detail": detail }),
        actor,
    )
}
