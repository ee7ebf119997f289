// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only sink for edition events.

use async_trait::async_trait;

use crate::error::FolioError;
use crate::types::EditionEvent;

/// Append-only audit log of edition-affecting transitions.
///
/// There is deliberately no update or delete method. Implementations must
/// insert a new row for every call, never upsert by line item.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Appends a single event and returns its row id.
    async fn record(&self, event: &EditionEvent) -> Result<i64, FolioError>;

    /// Appends many events in one write.
    async fn record_batch(&self, events: &[EditionEvent]) -> Result<usize, FolioError>;

    /// Events for a product, oldest first.
    async fn events_for_product(&self, product_id: &str) -> Result<Vec<EditionEvent>, FolioError>;

    /// Events for a line item, oldest first.
    async fn events_for_line_item(
        &self,
        line_item_id: &str,
    ) -> Result<Vec<EditionEvent>, FolioError>;
}
