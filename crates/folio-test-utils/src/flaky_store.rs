// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A purchase store whose numbering writes fail a set number of times.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use async_trait::async_trait;
use folio_core::{
    EditionEvent, FlagChange, FolioError, LedgerEntry, LineItem, NumberingPlan, Order,
    OrderCorrection, Product, PurchaseStore,
};

/// Wraps another store and rejects the first `failures` calls to
/// [`PurchaseStore::apply_numbering`] with a storage error.
pub struct FlakyStore {
    inner: Arc<dyn PurchaseStore>,
    remaining: AtomicU32,
    numbering_calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<dyn PurchaseStore>, failures: u32) -> Self {
        Self {
            inner,
            remaining: AtomicU32::new(failures),
            numbering_calls: AtomicUsize::new(0),
        }
    }

    /// Calls to `apply_numbering`, failed ones included.
    pub fn numbering_calls(&self) -> usize {
        self.numbering_calls.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl PurchaseStore for FlakyStore {
    async fn upsert_product(&self, product: &Product) -> Result<(), FolioError> {
        self.inner.upsert_product(product).await
    }

    async fn insert_order(&self, order: &Order) -> Result<(), FolioError> {
        self.inner.insert_order(order).await
    }

    async fn insert_line_item(&self, item: &LineItem) -> Result<(), FolioError> {
        self.inner.insert_line_item(item).await
    }

    async fn get_product(&self, product_id: &str) -> Result<Option<Product>, FolioError> {
        self.inner.get_product(product_id).await
    }

    async fn get_order(&self, order_id: &str) -> Result<Option<Order>, FolioError> {
        self.inner.get_order(order_id).await
    }

    async fn find_orders_by_number(&self, number: &str) -> Result<Vec<Order>, FolioError> {
        self.inner.find_orders_by_number(number).await
    }

    async fn find_orders_by_customer(&self, customer: &str) -> Result<Vec<Order>, FolioError> {
        self.inner.find_orders_by_customer(customer).await
    }

    async fn list_orders(&self, limit: usize) -> Result<Vec<Order>, FolioError> {
        self.inner.list_orders(limit).await
    }

    async fn get_line_item(&self, line_item_id: &str) -> Result<Option<LineItem>, FolioError> {
        self.inner.get_line_item(line_item_id).await
    }

    async fn line_items_for_order(&self, order_id: &str) -> Result<Vec<LineItem>, FolioError> {
        self.inner.line_items_for_order(order_id).await
    }

    async fn line_items_for_owner(&self, owner: &str) -> Result<Vec<LineItem>, FolioError> {
        self.inner.line_items_for_owner(owner).await
    }

    async fn product_ledger(&self, product_id: &str) -> Result<Vec<LedgerEntry>, FolioError> {
        self.inner.product_ledger(product_id).await
    }

    async fn product_ids(&self) -> Result<Vec<String>, FolioError> {
        self.inner.product_ids().await
    }

    async fn apply_order_correction(
        &self,
        order_id: &str,
        correction: &OrderCorrection,
        events: &[EditionEvent],
    ) -> Result<(), FolioError> {
        self.inner
            .apply_order_correction(order_id, correction, events)
            .await
    }

    async fn invalidate_line_item(
        &self,
        line_item_id: &str,
        change: &FlagChange,
        event: &EditionEvent,
    ) -> Result<(), FolioError> {
        self.inner
            .invalidate_line_item(line_item_id, change, event)
            .await
    }

    async fn apply_numbering(&self, plan: &NumberingPlan) -> Result<(), FolioError> {
        self.numbering_calls.fetch_add(1, Ordering::SeqCst);
        if self.take_failure() {
            tracing::debug!(product_id = %plan.product_id, "injected numbering failure");
            return Err(FolioError::Storage {
                source: "database is locked".into(),
            });
        }
        self.inner.apply_numbering(plan).await
    }
}
