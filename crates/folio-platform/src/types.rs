// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response envelopes of the platform admin REST API.

use folio_core::PlatformOrder;
use serde::Deserialize;

/// `GET /orders/{id}.json`
#[derive(Debug, Deserialize)]
pub struct OrderEnvelope {
    pub order: PlatformOrder,
}

/// `GET /orders.json`
#[derive(Debug, Deserialize)]
pub struct OrdersEnvelope {
    #[serde(default)]
    pub orders: Vec<PlatformOrder>,
}

/// Error body. The platform returns either a string or a field map under `errors`.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub errors: serde_json::Value,
}

impl ApiErrorResponse {
    /// Flatten the error payload into one line.
    pub fn summary(&self) -> String {
        match &self.errors {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_envelope_defaults_to_empty() {
        let parsed: OrdersEnvelope = serde_json::from_str("{}").unwrap();
        assert!(parsed.orders.is_empty());
    }

    #[test]
    fn error_summary_handles_string_and_map() {
        let s: ApiErrorResponse =
            serde_json::from_str(r#"{"errors": "[API] Invalid API key"}"#).unwrap();
        assert_eq!(s.summary(), "[API] Invalid API key");
        let m: ApiErrorResponse =
            serde_json::from_str(r#"{"errors": {"name": ["is invalid"]}}"#).unwrap();
        assert_eq!(m.summary(), r#"{"name":["is invalid"]}"#);
    }
}
