// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Commerce platform adapter for the Folio edition ledger.
//!
//! Implements [`CommercePlatform`] over the platform's admin REST API. The
//! ledger only ever reads from the platform; nothing here writes upstream.

pub mod client;
pub mod types;

use async_trait::async_trait;
use folio_config::model::PlatformConfig;
use folio_core::{
    AdapterType, CommercePlatform, FolioError, HealthStatus, PlatformOrder, PluginAdapter,
};
use reqwest::StatusCode;
use tracing::debug;

use crate::client::PlatformClient;

/// Admin REST adapter implementing [`CommercePlatform`].
pub struct ShopPlatform {
    client: PlatformClient,
}

impl ShopPlatform {
    /// Creates the adapter from the `[platform]` configuration section.
    pub fn new(config: &PlatformConfig) -> Result<Self, FolioError> {
        let client = PlatformClient::new(config)?;
        debug!(
            base_url = config.resolved_base_url().as_deref().unwrap_or_default(),
            "platform adapter created"
        );
        Ok(Self { client })
    }
}

#[async_trait]
impl PluginAdapter for ShopPlatform {
    fn name(&self) -> &str {
        "shop-admin"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Platform
    }

    async fn health_check(&self) -> Result<HealthStatus, FolioError> {
        let status = match self.client.ping().await {
            Ok(status) => status,
            Err(e) => return Ok(HealthStatus::Unhealthy(e.to_string())),
        };
        Ok(match status {
            s if s.is_success() => HealthStatus::Healthy,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                HealthStatus::Unhealthy(format!("platform rejected credentials ({status})"))
            }
            s => HealthStatus::Degraded(format!("platform returned {s}")),
        })
    }

    async fn shutdown(&self) -> Result<(), FolioError> {
        Ok(())
    }
}

#[async_trait]
impl CommercePlatform for ShopPlatform {
    async fn get_order(&self, order_id: &str) -> Result<Option<PlatformOrder>, FolioError> {
        self.client.get_order(order_id).await
    }

    async fn search_orders_by_name(
        &self,
        query: &str,
    ) -> Result<Vec<PlatformOrder>, FolioError> {
        self.client.search_orders_by_name(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(uri: &str) -> PlatformConfig {
        PlatformConfig {
            base_url: Some(uri.to_string()),
            access_token: Some("shpat_test".into()),
            max_retries: 0,
            retry_backoff_ms: 1,
            ..PlatformConfig::default()
        }
    }

    #[tokio::test]
    async fn health_check_maps_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/shop.json"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let platform = ShopPlatform::new(&config(&server.uri())).unwrap();
        assert_eq!(platform.adapter_type(), AdapterType::Platform);
        assert!(matches!(
            platform.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));
    }

    #[tokio::test]
    async fn health_check_healthy_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/shop.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"shop": {}})))
            .mount(&server)
            .await;

        let platform = ShopPlatform::new(&config(&server.uri())).unwrap();
        assert_eq!(platform.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn trait_delegates_to_client() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orders/55.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "order": {"id": 55, "name": "#1055", "cancelled_at": "2026-02-01T10:00:00Z"}
            })))
            .mount(&server)
            .await;

        let platform: Box<dyn CommercePlatform> =
            Box::new(ShopPlatform::new(&config(&server.uri())).unwrap());
        let order = platform.get_order("55").await.unwrap().unwrap();
        assert!(order.is_cancelled());
        assert!(order.cancelled_at_utc().is_some());
    }
}
