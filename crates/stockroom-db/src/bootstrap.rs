//! # First-Run Bootstrap
//!
//! Sample catalog written when the database file is created.

use sqlx::SqliteConnection;
use stockroom_core::{generate_id, Money, Product};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::catalog;

/// The two products a brand-new store starts with.
pub fn seed_products() -> Vec<Product> {
    vec![
        Product {
            id: generate_id(),
            barcode: "6901234567890".to_string(),
            name: "矿泉水 500ml".to_string(),
            category: "饮料".to_string(),
            purchase_price: Some(Money::from_cents(100)),
            bulk_price: Some(Money::from_cents(2000)),
            bulk_quantity: 24,
            price: Some(Money::from_cents(250)),
            profit_margin: None,
            stock: 50,
            location: "货架 A1".to_string(),
            ..Default::default()
        },
        Product {
            id: generate_id(),
            barcode: "6909876543210".to_string(),
            name: "方便面".to_string(),
            category: "食品".to_string(),
            purchase_price: Some(Money::from_cents(150)),
            bulk_price: Some(Money::from_cents(3000)),
            bulk_quantity: 20,
            price: Some(Money::from_cents(400)),
            profit_margin: None,
            stock: 30,
            location: "货架 B2".to_string(),
            ..Default::default()
        },
    ]
}

/// Writes the sample catalog. The ledger tables stay empty.
pub async fn seed(conn: &mut SqliteConnection) -> DbResult<()> {
    let products = seed_products();
    debug!(count = products.len(), "Seeding sample catalog");
    catalog::save_products(conn, &products).await
}
