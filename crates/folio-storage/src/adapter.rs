// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the purchase store and audit sink traits.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use folio_config::model::StorageConfig;
use folio_core::{
    AdapterType, AuditSink, EditionEvent, FlagChange, FolioError, HealthStatus, LedgerEntry,
    LineItem, NumberingPlan, Order, OrderCorrection, PluginAdapter, Product, PurchaseStore,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed purchase store and audit log.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is opened by [`SqliteStore::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a store for the given configuration without opening it.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Create and initialize a store in one step.
    pub async fn open(config: StorageConfig) -> Result<Self, FolioError> {
        let store = Self::new(config);
        store.initialize().await?;
        Ok(store)
    }

    /// Open the database and run pending migrations.
    pub async fn initialize(&self) -> Result<(), FolioError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| FolioError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite store initialized");
        Ok(())
    }

    /// Returns the underlying Database, or an error if not initialized.
    pub fn db(&self) -> Result<&Database, FolioError> {
        self.db.get().ok_or_else(|| FolioError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    async fn checkpoint(&self) -> Result<(), FolioError> {
        if let Some(db) = self.db.get() {
            db.connection()
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(crate::database::map_tr_err)?;
            debug!("WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, FolioError> {
        let db = match self.db() {
            Ok(db) => db,
            Err(e) => return Ok(HealthStatus::Unhealthy(e.to_string())),
        };
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FolioError> {
        self.checkpoint().await
    }
}

#[async_trait]
impl PurchaseStore for SqliteStore {
    // --- Ingestion ---

    async fn upsert_product(&self, product: &Product) -> Result<(), FolioError> {
        queries::products::upsert_product(self.db()?, product).await
    }

    async fn insert_order(&self, order: &Order) -> Result<(), FolioError> {
        queries::orders::insert_order(self.db()?, order).await
    }

    async fn insert_line_item(&self, item: &LineItem) -> Result<(), FolioError> {
        queries::line_items::insert_line_item(self.db()?, item).await
    }

    // --- Reads ---

    async fn get_product(&self, product_id: &str) -> Result<Option<Product>, FolioError> {
        queries::products::get_product(self.db()?, product_id).await
    }

    async fn get_order(&self, order_id: &str) -> Result<Option<Order>, FolioError> {
        queries::orders::get_order(self.db()?, order_id).await
    }

    async fn find_orders_by_number(&self, number: &str) -> Result<Vec<Order>, FolioError> {
        queries::orders::find_orders_by_number(self.db()?, number).await
    }

    async fn find_orders_by_customer(&self, customer: &str) -> Result<Vec<Order>, FolioError> {
        queries::orders::find_orders_by_customer(self.db()?, customer).await
    }

    async fn list_orders(&self, limit: usize) -> Result<Vec<Order>, FolioError> {
        queries::orders::list_orders(self.db()?, limit).await
    }

    async fn get_line_item(&self, line_item_id: &str) -> Result<Option<LineItem>, FolioError> {
        queries::line_items::get_line_item(self.db()?, line_item_id).await
    }

    async fn line_items_for_order(&self, order_id: &str) -> Result<Vec<LineItem>, FolioError> {
        queries::line_items::line_items_for_order(self.db()?, order_id).await
    }

    async fn line_items_for_owner(&self, owner: &str) -> Result<Vec<LineItem>, FolioError> {
        queries::line_items::line_items_for_owner(self.db()?, owner).await
    }

    async fn product_ledger(&self, product_id: &str) -> Result<Vec<LedgerEntry>, FolioError> {
        queries::line_items::product_ledger(self.db()?, product_id).await
    }

    async fn product_ids(&self) -> Result<Vec<String>, FolioError> {
        queries::line_items::product_ids(self.db()?).await
    }

    // --- Writes ---

    async fn apply_order_correction(
        &self,
        order_id: &str,
        correction: &OrderCorrection,
        events: &[EditionEvent],
    ) -> Result<(), FolioError> {
        queries::orders::apply_order_correction(self.db()?, order_id, correction, events).await
    }

    async fn invalidate_line_item(
        &self,
        line_item_id: &str,
        change: &FlagChange,
        event: &EditionEvent,
    ) -> Result<(), FolioError> {
        queries::line_items::invalidate_line_item(self.db()?, line_item_id, change, event).await
    }

    async fn apply_numbering(&self, plan: &NumberingPlan) -> Result<(), FolioError> {
        queries::line_items::apply_numbering(self.db()?, plan).await
    }
}

#[async_trait]
impl AuditSink for SqliteStore {
    async fn record(&self, event: &EditionEvent) -> Result<i64, FolioError> {
        queries::events::record(self.db()?, event).await
    }

    async fn record_batch(&self, events: &[EditionEvent]) -> Result<usize, FolioError> {
        queries::events::record_batch(self.db()?, events).await
    }

    async fn events_for_product(&self, product_id: &str) -> Result<Vec<EditionEvent>, FolioError> {
        queries::events::events_for_product(self.db()?, product_id).await
    }

    async fn events_for_line_item(
        &self,
        line_item_id: &str,
    ) -> Result<Vec<EditionEvent>, FolioError> {
        queries::events::events_for_line_item(self.db()?, line_item_id).await
    }
}
