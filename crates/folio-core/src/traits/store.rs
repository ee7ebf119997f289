// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Purchase record store trait.

use async_trait::async_trait;

use crate::error::FolioError;
use crate::types::{
    EditionEvent, FlagChange, LedgerEntry, LineItem, NumberingPlan, Order, OrderCorrection,
    Product,
};

/// Persistence of orders, line items and products.
///
/// Only the ledger engine writes edition fields, through
/// [`apply_numbering`](PurchaseStore::apply_numbering) and
/// [`invalidate_line_item`](PurchaseStore::invalidate_line_item). Both are
/// all-or-nothing: either every change and event lands, or none does.
#[async_trait]
pub trait PurchaseStore: Send + Sync {
    // --- Ingestion ---

    /// Insert or replace a product record.
    async fn upsert_product(&self, product: &Product) -> Result<(), FolioError>;

    /// Insert a new order.
    async fn insert_order(&self, order: &Order) -> Result<(), FolioError>;

    /// Insert a new line item. The owning order must already exist.
    async fn insert_line_item(&self, item: &LineItem) -> Result<(), FolioError>;

    // --- Reads ---

    async fn get_product(&self, product_id: &str) -> Result<Option<Product>, FolioError>;

    async fn get_order(&self, order_id: &str) -> Result<Option<Order>, FolioError>;

    /// Orders whose name or number matches `number` (with or without `#`).
    async fn find_orders_by_number(&self, number: &str) -> Result<Vec<Order>, FolioError>;

    /// Orders whose customer id or email matches `customer`.
    async fn find_orders_by_customer(&self, customer: &str) -> Result<Vec<Order>, FolioError>;

    /// Most recent orders first.
    async fn list_orders(&self, limit: usize) -> Result<Vec<Order>, FolioError>;

    async fn get_line_item(&self, line_item_id: &str) -> Result<Option<LineItem>, FolioError>;

    async fn line_items_for_order(&self, order_id: &str) -> Result<Vec<LineItem>, FolioError>;

    /// Line items whose owner id or email matches `owner`.
    async fn line_items_for_owner(&self, owner: &str) -> Result<Vec<LineItem>, FolioError>;

    /// Every line item of a product joined with its order, in storage order.
    async fn product_ledger(&self, product_id: &str) -> Result<Vec<LedgerEntry>, FolioError>;

    /// Distinct product ids that have at least one line item.
    async fn product_ids(&self) -> Result<Vec<String>, FolioError>;

    // --- Writes ---

    /// Overwrite status fields on an order and append `events`, atomically.
    async fn apply_order_correction(
        &self,
        order_id: &str,
        correction: &OrderCorrection,
        events: &[EditionEvent],
    ) -> Result<(), FolioError>;

    /// Flip flags, clear the edition number and append `event`, atomically.
    async fn invalidate_line_item(
        &self,
        line_item_id: &str,
        change: &FlagChange,
        event: &EditionEvent,
    ) -> Result<(), FolioError>;

    /// Apply every numbering change and append every event, atomically.
    async fn apply_numbering(&self, plan: &NumberingPlan) -> Result<(), FolioError>;
}
