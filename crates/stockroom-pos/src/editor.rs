//! # Catalog Editor
//!
//! Create, update and delete catalog entries. Each operation is one
//! serialized write, so the barcode uniqueness check and the stock-log entry
//! see the same catalog that gets persisted.
//!
//! Stock changes made here are logged with fixed operators:
//!
//! | Operation        | Logged when                         | Type            | Operator     |
//! |------------------|-------------------------------------|-----------------|--------------|
//! | `add_product`    | stock > 0 and barcode non-empty     | `in_initial`    | `system`     |
//! | `update_product` | stock value changed                 | `adjust_manual` | `stock-edit` |
//! | `delete_product` | never                               |                 |              |

use stockroom_core::lookup::position_by_barcode;
use stockroom_core::validation::{validate_new_product, validate_product_update};
use stockroom_core::{
    generate_id, NewProduct, Product, ProductUpdate, StockChangeType, StockLogEntry,
    ValidationError,
};
use stockroom_db::Database;
use tracing::{debug, info};

use crate::error::PosResult;

/// Operator recorded for the opening stock of a new product.
pub const SYSTEM_OPERATOR: &str = "system";

/// Operator recorded when stock is edited directly on the product form.
pub const STOCK_EDIT_OPERATOR: &str = "stock-edit";

const INITIAL_STOCK_NOTE: &str = "initial stock";
const MANUAL_EDIT_NOTE: &str = "manual stock edit";

/// Maintains the product catalog.
#[derive(Debug, Clone)]
pub struct CatalogEditor {
    db: Database,
}

impl CatalogEditor {
    pub fn new(db: Database) -> Self {
        CatalogEditor { db }
    }

    /// Adds a product with a fresh id.
    ///
    /// ## Errors
    /// - [`PosError::Validation`] for an empty name, negative amounts or a
    ///   barcode already in use
    pub async fn add_product(&self, draft: NewProduct) -> PosResult<Product> {
        validate_new_product(&draft)?;
        let product = draft.into_product(generate_id());
        debug!(barcode = %product.barcode, name = %product.name, "Adding product");

        let mut tx = self.db.begin_write().await?;
        let mut products = tx.load_products().await?;
        ensure_unique_barcode(&products, &product.barcode, None)?;

        products.push(product.clone());
        tx.save_products(&products).await?;

        if product.stock > 0 && product.has_barcode() {
            let entry = StockLogEntry::record(
                &product.barcode,
                &product.name,
                0,
                product.stock,
                StockChangeType::InInitial,
                SYSTEM_OPERATOR,
                INITIAL_STOCK_NOTE,
                crate::now(),
            );
            tx.append_stock_log(&entry).await?;
        }
        tx.commit().await?;

        info!(id = %product.id, barcode = %product.barcode, stock = product.stock, "Product added");
        Ok(product)
    }

    /// Applies `update` to the product carrying `barcode`.
    pub async fn update_product(&self, barcode: &str, update: ProductUpdate) -> PosResult<Product> {
        validate_product_update(&update)?;
        let barcode = barcode.trim();
        debug!(barcode, "Updating product");

        let mut tx = self.db.begin_write().await?;
        let mut products = tx.load_products().await?;

        let index = position_by_barcode(&products, barcode)?;

        let before = products[index].stock;
        let mut updated = products[index].clone();
        update.apply(&mut updated);

        if updated.barcode != products[index].barcode {
            ensure_unique_barcode(&products, &updated.barcode, Some(index))?;
        }

        products[index] = updated.clone();
        tx.save_products(&products).await?;

        if updated.stock != before {
            let entry = StockLogEntry::record(
                &updated.barcode,
                &updated.name,
                before,
                updated.stock - before,
                StockChangeType::AdjustManual,
                STOCK_EDIT_OPERATOR,
                MANUAL_EDIT_NOTE,
                crate::now(),
            );
            tx.append_stock_log(&entry).await?;
        }
        tx.commit().await?;

        info!(id = %updated.id, barcode = %updated.barcode, "Product updated");
        Ok(updated)
    }

    /// Removes every product carrying `barcode` and returns how many went.
    ///
    /// An unknown barcode is not an error.
    pub async fn delete_product(&self, barcode: &str) -> PosResult<usize> {
        let barcode = barcode.trim();

        let mut tx = self.db.begin_write().await?;
        let mut products = tx.load_products().await?;
        let count = products.len();
        products.retain(|p| !p.matches_barcode(barcode));
        let removed = count - products.len();

        if removed == 0 {
            tx.rollback().await?;
            debug!(barcode, "Nothing to delete");
            return Ok(0);
        }

        tx.save_products(&products).await?;
        tx.commit().await?;

        info!(barcode, removed, "Product deleted");
        Ok(removed)
    }
}

/// Rejects `barcode` if any entry other than the one at `except` carries it.
///
/// Entries are told apart by position: rows loaded from a table without an
/// id column all share the empty id.
fn ensure_unique_barcode(
    products: &[Product],
    barcode: &str,
    except: Option<usize>,
) -> Result<(), ValidationError> {
    let taken = products
        .iter()
        .enumerate()
        .any(|(i, p)| p.matches_barcode(barcode) && Some(i) != except);
    if taken {
        return Err(ValidationError::Duplicate {
            field: "barcode".to_string(),
            value: barcode.to_string(),
        });
    }
    Ok(())
}
