// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Folio edition ledger.
//!
//! This crate provides the error type, the domain model (orders, line items,
//! products, edition events, platform orders) and the adapter traits that the
//! storage and platform crates implement. The ledger engine in `folio-ledger`
//! only ever talks to these traits.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::FolioError;
pub use types::{
    AdapterType, EditionEvent, EditionEventType, FlagChange, HealthStatus, LedgerEntry, LineItem,
    LineItemStatus, Mismatch, NumberChange, NumberingPlan, Order, OrderCorrection, OrderSource,
    PlatformOrder, Product, RefundStatus, Severity,
};

// Re-export all adapter traits at crate root.
pub use traits::{AuditSink, CommercePlatform, PluginAdapter, PurchaseStore};
