// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The editions an owner holds.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use folio_core::{FolioError, LineItem};
use serde::Serialize;
use tracing::debug;

use crate::Ledger;
use crate::dedupe::dedupe;
use crate::validity::is_numberable;

/// One owned edition as shown to its owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditionView {
    pub line_item_id: String,
    pub product_id: String,
    pub edition_number: u32,
    pub edition_total: Option<u32>,
    pub certificate_access_token: Option<String>,
    pub nfc_tag_id: Option<String>,
    pub nfc_claimed_at: Option<DateTime<Utc>>,
}

impl EditionView {
    fn from_item(item: LineItem, product_id: String, edition_number: u32) -> Self {
        Self {
            line_item_id: item.line_item_id,
            product_id,
            edition_number,
            edition_total: item.edition_total,
            certificate_access_token: item.certificate_access_token,
            nfc_tag_id: item.nfc_tag_id,
            nfc_claimed_at: item.nfc_claimed_at,
        }
    }
}

impl Ledger {
    /// Valid, numbered editions owned by `owner` (an owner id or email).
    ///
    /// Orders are deduplicated first, so a purchase recorded both by hand
    /// and by the platform yields one edition. Sorted by product, then
    /// edition number.
    pub async fn get_valid_editions_for(
        &self,
        owner: &str,
    ) -> Result<Vec<EditionView>, FolioError> {
        let items = self.store.line_items_for_owner(owner).await?;

        let mut orders = Vec::new();
        let mut seen = HashSet::new();
        for item in &items {
            if !seen.insert(item.order_id.clone()) {
                continue;
            }
            if let Some(order) = self.store.get_order(&item.order_id).await? {
                orders.push(order);
            }
        }
        let winners: HashMap<String, _> = dedupe(&orders)
            .into_iter()
            .map(|o| (o.order_id.clone(), o))
            .collect();

        let mut totals: HashMap<String, Option<u32>> = HashMap::new();
        let mut views = Vec::new();
        for item in items {
            let Some(order) = winners.get(&item.order_id) else {
                debug!(
                    line_item_id = %item.line_item_id,
                    order_id = %item.order_id,
                    "skipped duplicate order"
                );
                continue;
            };
            if !is_numberable(&item, order) {
                continue;
            }
            let (Some(product_id), Some(number)) = (item.product_id.clone(), item.edition_number)
            else {
                continue;
            };
            let mut view = EditionView::from_item(item, product_id, number);
            if view.edition_total.is_none() {
                if !totals.contains_key(&view.product_id) {
                    let size = self
                        .store
                        .get_product(&view.product_id)
                        .await?
                        .and_then(|p| p.edition_size);
                    totals.insert(view.product_id.clone(), size);
                }
                view.edition_total = totals.get(&view.product_id).copied().flatten();
            }
            views.push(view);
        }

        views.sort_by(|a, b| {
            a.product_id
                .cmp(&b.product_id)
                .then(a.edition_number.cmp(&b.edition_number))
        });
        Ok(views)
    }
}
