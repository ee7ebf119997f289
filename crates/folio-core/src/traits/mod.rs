// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod audit;
pub mod platform;
pub mod store;

pub use adapter::PluginAdapter;
pub use audit::AuditSink;
pub use platform::CommercePlatform;
pub use store::PurchaseStore;
