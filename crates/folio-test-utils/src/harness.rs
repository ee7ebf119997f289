// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end ledger tests.
//!
//! `TestHarness` assembles a [`Ledger`] over a SQLite store in a temp
//! directory and a [`MockPlatform`], with optional numbering failures.

use std::sync::Arc;

use folio_config::model::StorageConfig;
use folio_core::{FolioError, LineItem, Order, Product, PurchaseStore};
use folio_ledger::{Ledger, LedgerSettings};
use folio_storage::SqliteStore;

use crate::flaky_store::FlakyStore;
use crate::mock_platform::MockPlatform;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    products: Vec<Product>,
    numbering_failures: u32,
    settings: LedgerSettings,
    platform: Option<MockPlatform>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            products: Vec::new(),
            numbering_failures: 0,
            settings: LedgerSettings {
                actor: "test".into(),
                ..LedgerSettings::default()
            },
            platform: None,
        }
    }

    /// Register a product with an optional edition size.
    pub fn with_product(mut self, product_id: &str, edition_size: Option<u32>) -> Self {
        self.products.push(Product {
            product_id: product_id.into(),
            title: Some(format!("Print {product_id}")),
            edition_size,
        });
        self
    }

    /// Fail the first `failures` numbering writes with a storage error.
    pub fn with_numbering_failures(mut self, failures: u32) -> Self {
        self.numbering_failures = failures;
        self
    }

    pub fn with_settings(mut self, settings: LedgerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Use a pre-loaded platform instead of an empty one.
    pub fn with_platform(mut self, platform: MockPlatform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Build the harness, creating the database and registering products.
    pub async fn build(self) -> Result<TestHarness, FolioError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| FolioError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("ledger.db");
        let config = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };
        let sqlite = Arc::new(SqliteStore::open(config).await?);
        for product in &self.products {
            sqlite.upsert_product(product).await?;
        }

        let flaky = Arc::new(FlakyStore::new(sqlite.clone(), self.numbering_failures));
        let platform = Arc::new(self.platform.unwrap_or_default());
        let ledger = Ledger::new(flaky.clone(), sqlite.clone(), self.settings)
            .with_platform(platform.clone());

        Ok(TestHarness {
            ledger: Arc::new(ledger),
            store: sqlite,
            flaky,
            platform,
            _temp_dir: temp_dir,
        })
    }
}

/// A ledger over a temporary store, ready for integration tests.
pub struct TestHarness {
    pub ledger: Arc<Ledger>,
    /// The underlying store, bypassing failure injection.
    pub store: Arc<SqliteStore>,
    pub flaky: Arc<FlakyStore>,
    pub platform: Arc<MockPlatform>,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub async fn insert_order(&self, order: &Order) -> Result<(), FolioError> {
        self.store.insert_order(order).await
    }

    pub async fn insert_item(&self, item: &LineItem) -> Result<(), FolioError> {
        self.store.insert_line_item(item).await
    }

    /// `(line_item_id, edition_number)` for a product in storage order.
    pub async fn numbers(
        &self,
        product_id: &str,
    ) -> Result<Vec<(String, Option<u32>)>, FolioError> {
        Ok(self
            .store
            .product_ledger(product_id)
            .await?
            .into_iter()
            .map(|e| (e.item.line_item_id, e.item.edition_number))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{line_item, order};

    #[tokio::test]
    async fn harness_resequences_through_flaky_store() {
        let harness = TestHarness::builder()
            .with_product("P", Some(10))
            .with_numbering_failures(1)
            .build()
            .await
            .unwrap();
        let o = order("1001", "#1001");
        harness.insert_order(&o).await.unwrap();
        harness.insert_item(&line_item("a", &o, "P", 0)).await.unwrap();

        let outcome = harness.ledger.resequence("P").await.unwrap();
        assert_eq!(outcome.assigned, 1);
        assert_eq!(harness.flaky.numbering_calls(), 2);
        assert_eq!(
            harness.numbers("P").await.unwrap(),
            vec![("a".to_string(), Some(1))]
        );
    }
}
