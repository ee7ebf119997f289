// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Folio integration tests.
//!
//! Provides fixtures, mock adapters and a harness that wires a ledger to a
//! temporary SQLite store, so tests run without a network or shared state.
//!
//! # Components
//!
//! - [`fixtures`] - order, line item and platform order builders
//! - [`MockPlatform`] - in-memory commerce platform with failure injection
//! - [`FlakyStore`] - store wrapper that fails the first numbering writes
//! - [`TestHarness`] - ledger, store and platform assembled in a temp dir

pub mod fixtures;
pub mod flaky_store;
pub mod harness;
pub mod mock_platform;

pub use flaky_store::FlakyStore;
pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_platform::MockPlatform;
