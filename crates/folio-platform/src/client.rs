// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the commerce platform admin REST API.
//!
//! Provides [`PlatformClient`] which handles URL construction, token
//! authentication, per-request timeouts, and retry with exponential backoff
//! for transient failures (connect errors, timeouts, 429, 5xx). Any other
//! transport error fails the call at once.

use std::time::Duration;

use folio_config::model::PlatformConfig;
use folio_core::{FolioError, PlatformOrder};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, OrderEnvelope, OrdersEnvelope};

/// Header carrying the admin API access token.
const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Upper bound on a server-requested `Retry-After` delay.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

/// HTTP client for platform order lookups.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    client: reqwest::Client,
    base_url: Url,
    max_retries: u32,
    retry_backoff: Duration,
}

impl PlatformClient {
    /// Creates a client from the `[platform]` configuration section.
    ///
    /// Fails with [`FolioError::Config`] when no access token or base URL is configured.
    pub fn new(config: &PlatformConfig) -> Result<Self, FolioError> {
        let token = config
            .access_token
            .as_deref()
            .ok_or_else(|| FolioError::Config("platform.access_token is not set".into()))?;
        let base = config.resolved_base_url().ok_or_else(|| {
            FolioError::Config("platform.base_url or platform.shop_domain must be set".into())
        })?;
        let base_url = Url::parse(&base)
            .map_err(|e| FolioError::Config(format!("invalid platform base URL {base:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(FolioError::Config(format!(
                "platform base URL {base:?} cannot carry a path"
            )));
        }

        let mut headers = HeaderMap::new();
        let mut token_value = HeaderValue::from_str(token)
            .map_err(|e| FolioError::Config(format!("invalid access token header value: {e}")))?;
        token_value.set_sensitive(true);
        headers.insert(ACCESS_TOKEN_HEADER, token_value);
        headers.insert("accept", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FolioError::Platform {
                status: None,
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url,
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    /// Fetch one order by id, including cancelled and archived orders.
    ///
    /// Returns `Ok(None)` on a 404.
    pub async fn get_order(&self, order_id: &str) -> Result<Option<PlatformOrder>, FolioError> {
        let url = self.endpoint(&["orders", &format!("{order_id}.json")], &[("status", "any")]);
        let envelope: Option<OrderEnvelope> = self.get_json(url).await?;
        Ok(envelope.map(|e| e.order))
    }

    /// Search orders by name.
    pub async fn search_orders_by_name(
        &self,
        query: &str,
    ) -> Result<Vec<PlatformOrder>, FolioError> {
        let url = self.endpoint(&["orders.json"], &[("status", "any"), ("name", query)]);
        let envelope: Option<OrdersEnvelope> = self.get_json(url).await?;
        Ok(envelope.map(|e| e.orders).unwrap_or_default())
    }

    /// One unretried request against the shop endpoint.
    pub async fn ping(&self) -> Result<StatusCode, FolioError> {
        let url = self.endpoint(&["shop.json"], &[]);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FolioError::Platform {
                status: None,
                message: format!("HTTP request failed: {e}"),
            })?;
        Ok(response.status())
    }

    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        // `new` rejects cannot-be-a-base URLs, so the segment list is always available.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }

    /// GET `url` and decode the body, retrying transient failures.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>, FolioError> {
        let mut last_error = String::new();
        let mut delay = self.retry_backoff;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    path = url.path(),
                    "retrying platform request"
                );
                tokio::time::sleep(delay).await;
                delay = self
                    .retry_backoff
                    .saturating_mul(2u32.saturating_pow(attempt));
            }

            let response = match self.client.get(url.clone()).send().await {
                Ok(response) => response,
                Err(e) if e.is_timeout() || e.is_connect() => {
                    warn!(error = %e, attempt, "transient platform transport error");
                    last_error = format!("HTTP request failed: {e}");
                    continue;
                }
                Err(e) => {
                    return Err(FolioError::Platform {
                        status: None,
                        message: format!("HTTP request failed: {e}"),
                    });
                }
            };

            let status = response.status();
            debug!(status = %status, attempt, path = url.path(), "platform response received");

            if status == StatusCode::NOT_FOUND {
                return Ok(None);
            }

            if status.is_success() {
                let body = response.text().await.map_err(|e| FolioError::Platform {
                    status: Some(status.as_u16()),
                    message: format!("failed to read response body: {e}"),
                })?;
                let parsed = serde_json::from_str(&body).map_err(|e| FolioError::Platform {
                    status: Some(status.as_u16()),
                    message: format!("failed to parse platform response: {e}"),
                })?;
                return Ok(Some(parsed));
            }

            if is_transient_status(status) {
                if let Some(retry_after) = retry_after(response.headers()) {
                    delay = delay.max(retry_after);
                }
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient platform error, will retry");
                last_error = format!("platform returned {status}: {body}");
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => api_err.summary(),
                Err(_) => body,
            };
            return Err(FolioError::Platform {
                status: Some(status.as_u16()),
                message,
            });
        }

        Err(FolioError::UpstreamUnavailable {
            message: last_error,
            attempts: self.max_retries + 1,
        })
    }
}

/// Returns true for HTTP status codes worth retrying.
fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Seconds from a `Retry-After` header, capped.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get("retry-after")?.to_str().ok()?;
    let secs: f64 = raw.trim().parse().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some(Duration::from_secs_f64(secs.min(MAX_RETRY_AFTER.as_secs_f64())))
}
