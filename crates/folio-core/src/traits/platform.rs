// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only access to the external commerce platform.

use async_trait::async_trait;

use crate::error::FolioError;
use crate::types::PlatformOrder;

/// Read access to the authoritative order state on the commerce platform.
///
/// Implementations retry transient network failures themselves and surface
/// [`FolioError::UpstreamUnavailable`] once retries are exhausted. A
/// definitive "not found" is `Ok(None)` and is never retried.
#[async_trait]
pub trait CommercePlatform: Send + Sync {
    /// Fetch an order by its stable id, including cancelled and archived orders.
    async fn get_order(&self, order_id: &str) -> Result<Option<PlatformOrder>, FolioError>;

    /// Search orders by human-facing name (`#1114` or `1114`).
    async fn search_orders_by_name(&self, query: &str)
    -> Result<Vec<PlatformOrder>, FolioError>;
}
