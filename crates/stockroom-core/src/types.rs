//! # Domain Types
//!
//! Core domain types used throughout Stockroom.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │  Transaction    │   │  StockLogEntry  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  txn_id (UUID)  │   │  log_id (UUID)  │       │
//! │  │  barcode (key)  │   │  items          │   │  barcode        │       │
//! │  │  name           │   │  total / paid   │   │  change         │       │
//! │  │  price, stock   │   │  change         │   │  before / after │       │
//! │  └─────────────────┘   └────────┬────────┘   └─────────────────┘       │
//! │                                 │                                       │
//! │                        ┌────────▼────────┐   ┌─────────────────┐       │
//! │                        │    LineItem     │   │ StockChangeType │       │
//! │                        │  barcode, name  │   │ sale, in, out,  │       │
//! │                        │  price × qty    │   │ adjust, ...     │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! - `id`: UUID v4, immutable, never shown to the cashier
//! - `barcode`: the business key every lookup and mutation goes through

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::money::{self, Money};

/// Generates a fresh identifier for a product, transaction or log row.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Product
// =============================================================================

/// One catalog entry.
///
/// Free-text fields use the empty string for "not set". Prices are optional
/// because the catalog may hold rows whose price cell could not be read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier (UUID v4), assigned at creation.
    pub id: String,

    /// Barcode (EAN-13 etc.). Empty means none assigned.
    pub barcode: String,

    /// Display name shown to the cashier.
    pub name: String,

    pub category: String,

    /// Unit purchase price.
    pub purchase_price: Option<Money>,

    /// Price of one bulk pack (case, carton, box).
    pub bulk_price: Option<Money>,

    /// Units per bulk pack.
    pub bulk_quantity: i64,

    /// Selling price used at checkout.
    pub price: Option<Money>,

    /// Display-only value; round-tripped verbatim.
    pub profit_margin: Option<String>,

    /// Units on hand. Not floored at zero.
    pub stock: i64,

    pub location: String,
    pub supplier: String,
    pub image_path: String,
    pub notes: String,

    /// Free-form; never validated.
    pub expiry_date: Option<String>,
}

impl Product {
    /// Price charged at checkout. A missing price sells at zero.
    #[inline]
    pub fn sale_price(&self) -> Money {
        self.price.unwrap_or_default()
    }

    /// Whether a barcode has been assigned.
    #[inline]
    pub fn has_barcode(&self) -> bool {
        !self.barcode.is_empty()
    }

    /// Exact barcode equality. An empty code never matches.
    #[inline]
    pub fn matches_barcode(&self, code: &str) -> bool {
        !code.is_empty() && self.barcode == code
    }
}

// =============================================================================
// Product Input
// =============================================================================

/// Fields supplied when creating a product. The id is assigned by the editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewProduct {
    pub barcode: String,
    pub name: String,
    pub category: String,
    pub purchase_price: Option<Money>,
    pub bulk_price: Option<Money>,
    pub bulk_quantity: i64,
    pub price: Option<Money>,
    pub profit_margin: Option<String>,
    pub stock: i64,
    pub location: String,
    pub supplier: String,
    pub image_path: String,
    pub notes: String,
    pub expiry_date: Option<String>,
}

impl NewProduct {
    /// Builds the catalog entry, trimming the text fields a cashier types.
    pub fn into_product(self, id: String) -> Product {
        Product {
            id,
            barcode: self.barcode.trim().to_string(),
            name: self.name.trim().to_string(),
            category: self.category.trim().to_string(),
            purchase_price: self.purchase_price,
            bulk_price: self.bulk_price,
            bulk_quantity: self.bulk_quantity,
            price: self.price,
            profit_margin: self.profit_margin,
            stock: self.stock,
            location: self.location.trim().to_string(),
            supplier: self.supplier.trim().to_string(),
            image_path: self.image_path.trim().to_string(),
            notes: self.notes.trim().to_string(),
            expiry_date: self.expiry_date,
        }
    }
}

/// Partial update of a product. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductUpdate {
    pub barcode: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub purchase_price: Option<Money>,
    pub bulk_price: Option<Money>,
    pub bulk_quantity: Option<i64>,
    pub price: Option<Money>,
    pub profit_margin: Option<String>,
    pub stock: Option<i64>,
    pub location: Option<String>,
    pub supplier: Option<String>,
    pub image_path: Option<String>,
    pub notes: Option<String>,
    pub expiry_date: Option<String>,
}

impl ProductUpdate {
    /// Applies every supplied field to `product`. The id is never touched.
    pub fn apply(&self, product: &mut Product) {
        fn set(target: &mut String, value: &Option<String>) {
            if let Some(v) = value {
                *target = v.trim().to_string();
            }
        }

        set(&mut product.barcode, &self.barcode);
        set(&mut product.name, &self.name);
        set(&mut product.category, &self.category);
        set(&mut product.location, &self.location);
        set(&mut product.supplier, &self.supplier);
        set(&mut product.image_path, &self.image_path);
        set(&mut product.notes, &self.notes);

        if self.purchase_price.is_some() {
            product.purchase_price = self.purchase_price;
        }
        if self.bulk_price.is_some() {
            product.bulk_price = self.bulk_price;
        }
        if let Some(qty) = self.bulk_quantity {
            product.bulk_quantity = qty;
        }
        if self.price.is_some() {
            product.price = self.price;
        }
        if self.profit_margin.is_some() {
            product.profit_margin = self.profit_margin.clone();
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if self.expiry_date.is_some() {
            product.expiry_date = self.expiry_date.clone();
        }
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// One product + quantity inside a cart or a recorded transaction.
///
/// Product details are frozen when the line is created; the serialized form
/// is what the `items` column of the transactions table holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product id at the time the line was added.
    #[serde(rename = "id", default)]
    pub product_id: String,
    pub barcode: String,
    pub name: String,
    #[serde(with = "money::decimal")]
    pub price: Money,
    pub qty: i64,
    #[serde(with = "money::decimal")]
    pub subtotal: Money,
}

impl LineItem {
    /// Freezes a product's identity and price for `qty` units.
    ///
    /// ## Errors
    /// [`ValidationError::OutOfRange`] on `subtotal` when `price * qty` does
    /// not fit in an amount.
    pub fn from_product(product: &Product, qty: i64) -> Result<Self, ValidationError> {
        let price = product.sale_price();
        let subtotal = price
            .checked_mul_quantity(qty)
            .ok_or_else(|| amount_out_of_range("subtotal"))?;
        Ok(LineItem {
            product_id: product.id.clone(),
            barcode: product.barcode.clone(),
            name: product.name.clone(),
            price,
            qty,
            subtotal,
        })
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// One completed checkout. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub txn_id: String,
    pub datetime: NaiveDateTime,
    pub items: Vec<LineItem>,
    pub total: Money,
    pub paid: Money,
    /// `paid - total`; negative when underpaid. Never clamped.
    pub change: Money,
    pub operator: String,
    pub note: String,
}

impl Transaction {
    /// Builds a transaction record from checked-out lines.
    ///
    /// ## Errors
    /// [`ValidationError::OutOfRange`] when the total or the change does not
    /// fit in an amount.
    pub fn from_lines(
        items: Vec<LineItem>,
        paid: Money,
        operator: impl Into<String>,
        note: impl Into<String>,
        datetime: NaiveDateTime,
    ) -> Result<Self, ValidationError> {
        let total = Money::checked_sum(items.iter().map(|line| line.subtotal))
            .ok_or_else(|| amount_out_of_range("total"))?;
        let change = paid
            .checked_sub(total)
            .ok_or_else(|| amount_out_of_range("change"))?;
        Ok(Transaction {
            txn_id: generate_id(),
            datetime,
            items,
            total,
            paid,
            change,
            operator: operator.into(),
            note: note.into(),
        })
    }
}

pub(crate) fn amount_out_of_range(field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: i64::MIN,
        max: i64::MAX,
    }
}

// =============================================================================
// Stock Change Type
// =============================================================================

/// Why a stock level changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockChangeType {
    /// Decrement from a checkout.
    Sale,
    /// Goods received.
    In,
    /// Goods issued (damaged, returned to supplier, ...).
    Out,
    /// Stock-take correction entered through the warehouse form.
    Adjust,
    /// Stock edited directly on the product record.
    AdjustManual,
    /// Opening balance of a newly created product.
    InInitial,
}

impl StockChangeType {
    /// The tag stored in the `type` column.
    pub const fn as_str(&self) -> &'static str {
        match self {
            StockChangeType::Sale => "sale",
            StockChangeType::In => "in",
            StockChangeType::Out => "out",
            StockChangeType::Adjust => "adjust",
            StockChangeType::AdjustManual => "adjust_manual",
            StockChangeType::InInitial => "in_initial",
        }
    }
}

impl fmt::Display for StockChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StockChangeType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "sale" => Ok(StockChangeType::Sale),
            "in" => Ok(StockChangeType::In),
            "out" => Ok(StockChangeType::Out),
            "adjust" => Ok(StockChangeType::Adjust),
            "adjust_manual" => Ok(StockChangeType::AdjustManual),
            "in_initial" => Ok(StockChangeType::InInitial),
            other => Err(ValidationError::InvalidFormat {
                field: "type".to_string(),
                reason: format!("unknown stock change type '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Stock Log Entry
// =============================================================================

/// One stock-level change. Append-only.
///
/// ## Invariant
/// `after_stock == before_stock + change` for every entry built through
/// [`StockLogEntry::record`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLogEntry {
    pub log_id: String,
    pub datetime: NaiveDateTime,
    pub barcode: String,
    pub name: String,
    pub change: i64,
    pub before_stock: i64,
    pub after_stock: i64,
    #[serde(rename = "type")]
    pub change_type: StockChangeType,
    pub operator: String,
    pub note: String,
}

impl StockLogEntry {
    /// Records a change of `delta` units starting from `before`.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        barcode: impl Into<String>,
        name: impl Into<String>,
        before: i64,
        delta: i64,
        change_type: StockChangeType,
        operator: impl Into<String>,
        note: impl Into<String>,
        datetime: NaiveDateTime,
    ) -> Self {
        StockLogEntry {
            log_id: generate_id(),
            datetime,
            barcode: barcode.into(),
            name: name.into(),
            change: delta,
            before_stock: before,
            after_stock: before + delta,
            change_type,
            operator: operator.into(),
            note: note.into(),
        }
    }

    /// Checks the ledger invariant.
    #[inline]
    pub fn is_balanced(&self) -> bool {
        self.after_stock == self.before_stock + self.change
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 31)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn water() -> Product {
        Product {
            id: "p-1".to_string(),
            barcode: "6901234567890".to_string(),
            name: "矿泉水 500ml".to_string(),
            price: Some(Money::from_cents(250)),
            stock: 50,
            ..Default::default()
        }
    }

    #[test]
    fn test_sale_price_defaults_to_zero() {
        let mut p = water();
        assert_eq!(p.sale_price().cents(), 250);
        p.price = None;
        assert!(p.sale_price().is_zero());
    }

    #[test]
    fn test_matches_barcode_never_matches_empty() {
        let mut p = water();
        assert!(p.matches_barcode("6901234567890"));
        assert!(!p.matches_barcode("690123456789"));
        p.barcode.clear();
        assert!(!p.matches_barcode(""));
    }

    #[test]
    fn test_line_item_freezes_price() {
        let line = LineItem::from_product(&water(), 2).unwrap();
        assert_eq!(line.subtotal.cents(), 500);

        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["price"], serde_json::json!(2.5));
        assert_eq!(json["subtotal"], serde_json::json!(5.0));
        assert_eq!(json["id"], serde_json::json!("p-1"));
    }

    #[test]
    fn test_transaction_change_is_not_clamped() {
        let lines = vec![LineItem::from_product(&water(), 2).unwrap()];
        let txn = Transaction::from_lines(lines, Money::from_cents(300), "cashier", "", at())
            .unwrap();
        assert_eq!(txn.total.cents(), 500);
        assert_eq!(txn.change.cents(), -200);
    }

    #[test]
    fn test_line_item_rejects_subtotal_overflow() {
        let mut p = water();
        p.price = crate::schema::coerce_money(Some("50000000000000000"));
        assert!(matches!(
            LineItem::from_product(&p, 2),
            Err(ValidationError::OutOfRange { ref field, .. }) if field == "subtotal"
        ));
    }

    #[test]
    fn test_transaction_rejects_total_and_change_overflow() {
        let mut p = water();
        p.price = Some(Money::from_cents(i64::MAX / 2 + 1));
        let line = LineItem::from_product(&p, 1).unwrap();
        let err = Transaction::from_lines(vec![line.clone(), line], Money::zero(), "c", "", at())
            .unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { ref field, .. } if field == "total"));

        p.price = Some(Money::from_cents(-2));
        let line = LineItem::from_product(&p, 1).unwrap();
        let err = Transaction::from_lines(vec![line], Money::from_cents(i64::MAX), "c", "", at())
            .unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { ref field, .. } if field == "change"));
    }

    #[test]
    fn test_stock_log_entry_balances() {
        let entry = StockLogEntry::record(
            "6901234567890",
            "矿泉水 500ml",
            50,
            -2,
            StockChangeType::Sale,
            "cashier",
            "",
            at(),
        );
        assert_eq!(entry.after_stock, 48);
        assert!(entry.is_balanced());
    }

    #[test]
    fn test_stock_change_type_tags() {
        for ty in [
            StockChangeType::Sale,
            StockChangeType::In,
            StockChangeType::Out,
            StockChangeType::Adjust,
            StockChangeType::AdjustManual,
            StockChangeType::InInitial,
        ] {
            assert_eq!(ty.as_str().parse::<StockChangeType>().unwrap(), ty);
        }
        assert!("restock".parse::<StockChangeType>().is_err());
        assert_eq!(
            serde_json::to_string(&StockChangeType::AdjustManual).unwrap(),
            "\"adjust_manual\""
        );
    }

    #[test]
    fn test_update_applies_only_supplied_fields() {
        let mut p = water();
        let update = ProductUpdate {
            name: Some(" Spring Water ".to_string()),
            stock: Some(12),
            ..Default::default()
        };
        update.apply(&mut p);
        assert_eq!(p.name, "Spring Water");
        assert_eq!(p.stock, 12);
        assert_eq!(p.barcode, "6901234567890");
        assert_eq!(p.price, Some(Money::from_cents(250)));
    }
}
