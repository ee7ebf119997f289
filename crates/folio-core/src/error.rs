// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Folio edition ledger.

use thiserror::Error;

/// The error type shared by every Folio crate.
///
/// An order that the commerce platform does not know about is *not* an
/// error: platform lookups return `Ok(None)` and the reconciler reports it.
#[derive(Debug, Error)]
pub enum FolioError {
    /// Configuration errors (invalid TOML, missing credentials, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A referenced order, line item or product does not exist locally.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The commerce platform could not be reached after bounded retries.
    #[error("upstream unavailable after {attempts} attempt(s): {message}")]
    UpstreamUnavailable { message: String, attempts: u32 },

    /// The commerce platform gave a definitive, non-retryable error response.
    #[error("platform error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Platform { status: Option<u16>, message: String },

    /// Duplicate or gapped edition numbers were found for a product.
    #[error("edition invariant violated for product {product_id}: {detail}")]
    InvariantViolation { product_id: String, detail: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FolioError {
    /// Returns true when retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, FolioError::UpstreamUnavailable { .. })
    }

    /// Shorthand for a [`FolioError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        FolioError::NotFound {
            entity,
            id: id.into(),
        }
    }
}
