// SPDX-FileCopyrightText: 2026 Folio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Product reads and upserts.

use folio_core::{FolioError, Product};
use rusqlite::{OptionalExtension, params};

use crate::database::Database;
use crate::models::product_from_row;

/// Insert a product or overwrite its title and edition size.
pub async fn upsert_product(db: &Database, product: &Product) -> Result<(), FolioError> {
    let product = product.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO products (product_id, title, edition_size) VALUES (?1, ?2, ?3)
                 ON CONFLICT(product_id) DO UPDATE SET
                     title = excluded.title,
                     edition_size = excluded.edition_size",
                params![product.product_id, product.title, product.edition_size],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_product(db: &Database, product_id: &str) -> Result<Option<Product>, FolioError> {
    let product_id = product_id.to_string();
    db.connection()
        .call(move |conn| {
            let product = conn
                .query_row(
                    "SELECT product_id, title, edition_size FROM products WHERE product_id = ?1",
                    params![product_id],
                    product_from_row,
                )
                .optional()?;
            Ok(product)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
