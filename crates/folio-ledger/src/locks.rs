// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-product exclusive locks.
//!
//! Every read-modify-write of a product's edition numbering happens under
//! that product's lock. Locks are created lazily on first use and dropped
//! from the map once nobody holds or waits on them, so unrelated products
//! never contend.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

type LockMap = DashMap<String, Arc<Mutex<()>>>;

/// Keyed mutex map over product ids.
#[derive(Debug, Clone, Default)]
pub struct ProductLocks {
    inner: Arc<LockMap>,
}

/// Held lock for one product. Released on drop.
#[derive(Debug)]
pub struct ProductGuard {
    product_id: String,
    map: Arc<LockMap>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl ProductGuard {
    pub fn product_id(&self) -> &str {
        &self.product_id
    }
}

impl Drop for ProductGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // The map holds one reference; anything above that is a waiter.
        self.map
            .remove_if(&self.product_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl ProductLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `product_id`.
    pub async fn acquire(&self, product_id: &str) -> ProductGuard {
        let lock = self
            .inner
            .entry(product_id.to_string())
            .or_default()
            .clone();
        let guard = match lock.clone().try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => {
                debug!(product_id, "product lock contended, waiting");
                lock.lock_owned().await
            }
        };
        ProductGuard {
            product_id: product_id.to_string(),
            map: Arc::clone(&self.inner),
            guard: Some(guard),
        }
    }

    /// Lock several products, always in ascending id order so two callers
    /// locking overlapping sets cannot deadlock.
    pub async fn acquire_many<I, S>(&self, product_ids: I) -> Vec<ProductGuard>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ordered: BTreeSet<String> = product_ids.into_iter().map(Into::into).collect();
        let mut guards = Vec::with_capacity(ordered.len());
        for product_id in &ordered {
            guards.push(self.acquire(product_id).await);
        }
        guards
    }

    /// Number of products with a live lock entry.
    pub fn active(&self) -> usize {
        self.inner.len()
    }
}
