//! # Stock Mutator
//!
//! The single choke point for stock-level changes. Every change is one
//! serialized write: the catalog is re-read, the entry updated, the catalog
//! persisted and one stock-log entry appended, all in the same transaction.
//!
//! ```text
//!  adjust_stock(barcode, delta, operator, type, note)
//!     │
//!     ├── begin_write()                      (waits for other writers)
//!     ├── load catalog ── barcode absent ──► ProductNotFound, rollback
//!     ├── after = before + delta             (no floor, no ceiling)
//!     ├── save catalog
//!     ├── append StockLogEntry { before, delta, after, type, ... }
//!     └── commit ──► StockAdjustment { product, entry }
//! ```
//!
//! [`Warehouse`] wraps the mutator for the stock-in / stock-out form, which
//! accepts either a barcode or a product name.

use stockroom_core::lookup::position_by_barcode;
use stockroom_core::validation::validate_quantity;
use stockroom_core::{Product, StockChangeType, StockLogEntry, ValidationError};
use stockroom_db::{Database, WriteTx};
use tracing::{debug, info};

use crate::error::{PosError, PosResult};
use crate::lookup::LookupService;

/// Result of one stock change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockAdjustment {
    /// The product after the change.
    pub product: Product,
    /// The log entry that was appended.
    pub entry: StockLogEntry,
}

/// Applies stock changes, one serialized write each.
#[derive(Debug, Clone)]
pub struct StockMutator {
    db: Database,
}

impl StockMutator {
    pub fn new(db: Database) -> Self {
        StockMutator { db }
    }

    /// Changes the stock of the product carrying `barcode` by `delta`.
    ///
    /// ## Errors
    /// - [`PosError::ProductNotFound`] when no entry has the barcode; nothing
    ///   is written
    /// - [`PosError::Persistence`] when the store cannot be read or written
    pub async fn adjust_stock(
        &self,
        barcode: &str,
        delta: i64,
        operator: &str,
        change_type: StockChangeType,
        note: &str,
    ) -> PosResult<StockAdjustment> {
        debug!(barcode, delta, operator, kind = %change_type, "Adjusting stock");

        let mut tx = self.db.begin_write().await?;
        let adjustment =
            apply_adjustment(&mut tx, barcode, delta, operator, change_type, note).await?;
        tx.commit().await?;

        info!(
            barcode = %adjustment.entry.barcode,
            before = adjustment.entry.before_stock,
            after = adjustment.entry.after_stock,
            kind = %change_type,
            "Stock adjusted"
        );
        Ok(adjustment)
    }
}

/// Performs one stock change inside an already open write.
///
/// Shared by [`StockMutator::adjust_stock`] and atomic checkout, which
/// applies several of these before committing once.
pub(crate) async fn apply_adjustment(
    tx: &mut WriteTx,
    barcode: &str,
    delta: i64,
    operator: &str,
    change_type: StockChangeType,
    note: &str,
) -> PosResult<StockAdjustment> {
    let mut products = tx.load_products().await?;
    let index = position_by_barcode(&products, barcode)?;
    let product = &mut products[index];

    let before = product.stock;
    product.stock = before
        .checked_add(delta)
        .ok_or_else(|| ValidationError::OutOfRange {
            field: "stock".to_string(),
            min: i64::MIN,
            max: i64::MAX,
        })?;
    let product = product.clone();

    tx.save_products(&products).await?;

    let entry = StockLogEntry::record(
        &product.barcode,
        &product.name,
        before,
        delta,
        change_type,
        operator,
        note,
        crate::now(),
    );
    tx.append_stock_log(&entry).await?;

    Ok(StockAdjustment { product, entry })
}

// =============================================================================
// Warehouse Form
// =============================================================================

/// Stock-in, stock-out and correction movements from the warehouse form.
///
/// | Action    | Log type | Delta  |
/// |-----------|----------|--------|
/// | `receive` | `in`     | `+qty` |
/// | `issue`   | `out`    | `-qty` |
/// | `adjust`  | `adjust` | `+qty` |
#[derive(Debug, Clone)]
pub struct Warehouse {
    mutator: StockMutator,
    lookup: LookupService,
    operator: String,
}

impl Warehouse {
    pub fn new(mutator: StockMutator, lookup: LookupService, operator: impl Into<String>) -> Self {
        Warehouse {
            mutator,
            lookup,
            operator: operator.into(),
        }
    }

    /// Goods arriving. `input` is a barcode or a product name.
    pub async fn receive(
        &self,
        input: &str,
        qty: i64,
        operator: Option<&str>,
        note: &str,
    ) -> PosResult<StockAdjustment> {
        self.move_stock(input, qty, StockChangeType::In, operator, note)
            .await
    }

    /// Goods leaving outside a sale (breakage, returns to supplier).
    pub async fn issue(
        &self,
        input: &str,
        qty: i64,
        operator: Option<&str>,
        note: &str,
    ) -> PosResult<StockAdjustment> {
        self.move_stock(input, qty, StockChangeType::Out, operator, note)
            .await
    }

    /// Upward correction after a count.
    pub async fn adjust(
        &self,
        input: &str,
        qty: i64,
        operator: Option<&str>,
        note: &str,
    ) -> PosResult<StockAdjustment> {
        self.move_stock(input, qty, StockChangeType::Adjust, operator, note)
            .await
    }

    async fn move_stock(
        &self,
        input: &str,
        qty: i64,
        change_type: StockChangeType,
        operator: Option<&str>,
        note: &str,
    ) -> PosResult<StockAdjustment> {
        validate_quantity(qty)?;

        let product = self
            .lookup
            .resolve(input)
            .await
            .ok_or_else(|| PosError::ProductNotFound(input.trim().to_string()))?;
        if !product.has_barcode() {
            return Err(PosError::ProductNotFound(product.name));
        }

        let delta = match change_type {
            StockChangeType::Out => -qty,
            _ => qty,
        };
        let operator = operator.unwrap_or(&self.operator);

        self.mutator
            .adjust_stock(&product.barcode, delta, operator, change_type, note)
            .await
    }
}
