// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock commerce platform for deterministic reconciliation tests.
//!
//! `MockPlatform` serves orders from memory, can be told to fail for a
//! given order or for everything, and counts the lookups it answered.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use folio_core::{
    AdapterType, CommercePlatform, FolioError, HealthStatus, PlatformOrder, PluginAdapter,
};

/// An in-memory commerce platform keyed by order id.
#[derive(Default)]
pub struct MockPlatform {
    orders: Arc<Mutex<HashMap<String, PlatformOrder>>>,
    unavailable: Arc<Mutex<HashSet<String>>>,
    down: AtomicBool,
    delay: Mutex<Option<Duration>>,
    get_calls: AtomicUsize,
    search_calls: AtomicUsize,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a platform pre-loaded with `orders`.
    pub fn with_orders(orders: Vec<PlatformOrder>) -> Self {
        let map = orders.into_iter().map(|o| (o.id.clone(), o)).collect();
        Self {
            orders: Arc::new(Mutex::new(map)),
            ..Self::default()
        }
    }

    pub async fn insert(&self, order: PlatformOrder) {
        self.orders.lock().await.insert(order.id.clone(), order);
    }

    /// Every lookup of `order_id` fails as if the network dropped.
    pub async fn fail_for(&self, order_id: &str) {
        self.unavailable.lock().await.insert(order_id.to_string());
    }

    /// Toggle a full outage.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Sleep before answering each lookup.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.lock().await = Some(delay);
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    async fn before_call(&self, key: &str) -> Result<(), FolioError> {
        let delay = *self.delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.down.load(Ordering::SeqCst) || self.unavailable.lock().await.contains(key) {
            return Err(FolioError::UpstreamUnavailable {
                message: format!("mock platform unavailable for {key}"),
                attempts: 3,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for MockPlatform {
    fn name(&self) -> &str {
        "mock-platform"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Platform
    }

    async fn health_check(&self) -> Result<HealthStatus, FolioError> {
        if self.down.load(Ordering::SeqCst) {
            return Ok(HealthStatus::Unhealthy("mock outage".into()));
        }
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FolioError> {
        Ok(())
    }
}

#[async_trait]
impl CommercePlatform for MockPlatform {
    async fn get_order(&self, order_id: &str) -> Result<Option<PlatformOrder>, FolioError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.before_call(order_id).await?;
        Ok(self.orders.lock().await.get(order_id).cloned())
    }

    async fn search_orders_by_name(
        &self,
        query: &str,
    ) -> Result<Vec<PlatformOrder>, FolioError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.before_call(query).await?;
        let orders = self.orders.lock().await;
        let mut hits: Vec<PlatformOrder> =
            orders.values().filter(|o| o.name == query).cloned().collect();
        hits.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::platform_order;

    #[tokio::test]
    async fn serves_inserted_orders() {
        let platform = MockPlatform::with_orders(vec![platform_order("1", "#1")]);
        assert!(platform.get_order("1").await.unwrap().is_some());
        assert!(platform.get_order("2").await.unwrap().is_none());
        assert_eq!(platform.get_calls(), 2);
    }

    #[tokio::test]
    async fn search_matches_exact_name() {
        let platform = MockPlatform::new();
        platform.insert(platform_order("5501", "#1114")).await;
        assert_eq!(platform.search_orders_by_name("#1114").await.unwrap().len(), 1);
        assert!(platform.search_orders_by_name("1114").await.unwrap().is_empty());
        assert_eq!(platform.search_calls(), 2);
    }

    #[tokio::test]
    async fn injected_failures() {
        let platform = MockPlatform::with_orders(vec![platform_order("1", "#1")]);
        platform.fail_for("1").await;
        let err = platform.get_order("1").await.unwrap_err();
        assert!(err.is_transient());

        platform.set_down(true);
        assert!(matches!(
            platform.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));
        assert!(platform.search_orders_by_name("#1").await.is_err());
    }
}
