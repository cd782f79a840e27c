//! # Schema Adapter
//!
//! Maps the persisted product columns to [`Product`] fields and back.
//!
//! The products table has been written under two label sets over its life:
//! localized (Chinese) headers and the internal field names. Both are read;
//! only the localized set is ever written.
//!
//! ```text
//!   persisted columns                 SchemaAdapter                 Product
//!   ─────────────────   ──────────────────────────────────────   ───────────
//!   分类 / category   ─►  detect label set                     ─►  category
//!   序号 / id         ─►  resolve column index per field       ─►  id
//!   库存 / stock      ─►  coerce text (int / money / text)     ─►  stock
//!   ...                                                              ...
//! ```

use crate::money::Money;
use crate::types::Product;

// =============================================================================
// Label Tables
// =============================================================================

/// Number of persisted product fields.
pub const FIELD_COUNT: usize = 15;

/// `(localized, internal)` labels in the fixed column order used on write.
pub const PRODUCT_LABELS: [(&str, &str); FIELD_COUNT] = [
    ("分类", "category"),
    ("序号", "id"),
    ("商品名称", "name"),
    ("条形码", "barcode"),
    ("1件箱套条包盒价格", "bulk_price"),
    ("1件箱套条包盒数量", "bulk_quantity"),
    ("1个单位进货价格", "purchase_price"),
    ("销售价", "price"),
    ("利润率", "profit_margin"),
    ("库存", "stock"),
    ("位置", "location"),
    ("供应商", "supplier"),
    ("图片路径", "image_path"),
    ("备注", "notes"),
    ("expiry_date", "expiry_date"),
];

/// Localized column labels in write order.
pub fn localized_columns() -> impl Iterator<Item = &'static str> {
    PRODUCT_LABELS.iter().map(|(localized, _)| *localized)
}

/// Maps an internal field name to its localized label.
pub fn localize(internal: &str) -> Option<&'static str> {
    PRODUCT_LABELS
        .iter()
        .find(|(_, name)| *name == internal)
        .map(|(localized, _)| *localized)
}

/// Maps a localized label to its internal field name.
pub fn internalize(localized: &str) -> Option<&'static str> {
    PRODUCT_LABELS
        .iter()
        .find(|(label, _)| *label == localized)
        .map(|(_, name)| *name)
}

// Indexes into PRODUCT_LABELS.
const CATEGORY: usize = 0;
const ID: usize = 1;
const NAME: usize = 2;
const BARCODE: usize = 3;
const BULK_PRICE: usize = 4;
const BULK_QUANTITY: usize = 5;
const PURCHASE_PRICE: usize = 6;
const PRICE: usize = 7;
const PROFIT_MARGIN: usize = 8;
const STOCK: usize = 9;
const LOCATION: usize = 10;
const SUPPLIER: usize = 11;
const IMAGE_PATH: usize = 12;
const NOTES: usize = 13;
const EXPIRY_DATE: usize = 14;

// =============================================================================
// Label Set
// =============================================================================

/// Which header set a stored products table uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSet {
    Localized,
    Internal,
}

// =============================================================================
// Schema Adapter
// =============================================================================

/// Column layout of one stored products table.
///
/// Built from the table's column names; every field resolves to a column
/// index or to `None` (filled with its default on read).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaAdapter {
    label_set: LabelSet,
    positions: [Option<usize>; FIELD_COUNT],
}

impl SchemaAdapter {
    /// Inspects column names and resolves each field's position.
    ///
    /// The table counts as localized when any label that exists only in the
    /// localized set is present. Each field prefers the label of the detected
    /// set and falls back to the other one.
    pub fn detect<S: AsRef<str>>(columns: &[S]) -> Self {
        let find = |label: &str| columns.iter().position(|c| c.as_ref().trim() == label);

        let localized = PRODUCT_LABELS
            .iter()
            .filter(|(localized, internal)| localized != internal)
            .any(|(localized, _)| find(*localized).is_some());

        let label_set = if localized {
            LabelSet::Localized
        } else {
            LabelSet::Internal
        };

        let mut positions = [None; FIELD_COUNT];
        for (slot, (localized_label, internal_label)) in positions.iter_mut().zip(PRODUCT_LABELS) {
            let (primary, secondary) = match label_set {
                LabelSet::Localized => (localized_label, internal_label),
                LabelSet::Internal => (internal_label, localized_label),
            };
            *slot = find(primary).or_else(|| find(secondary));
        }

        SchemaAdapter {
            label_set,
            positions,
        }
    }

    /// The detected header set.
    pub fn label_set(&self) -> LabelSet {
        self.label_set
    }

    /// Internal names of fields that have no column in the table.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        self.positions
            .iter()
            .zip(PRODUCT_LABELS)
            .filter(|(pos, _)| pos.is_none())
            .map(|(_, (_, internal))| internal)
            .collect()
    }

    /// Builds a product from one row of raw cell text.
    ///
    /// Missing columns and NULL cells take defaults; numbers are coerced
    /// per [`coerce_count`] and [`coerce_money`].
    pub fn product_from_row(&self, row: &[Option<String>]) -> Product {
        let cell = |field: usize| -> Option<&str> {
            self.positions[field]
                .and_then(|i| row.get(i))
                .and_then(|v| v.as_deref())
        };
        let text = |field: usize| cell(field).map(str::to_string).unwrap_or_default();
        let optional_text =
            |field: usize| cell(field).filter(|v| !v.is_empty()).map(str::to_string);

        Product {
            id: text(ID),
            barcode: normalize_barcode(cell(BARCODE).unwrap_or_default()),
            name: text(NAME),
            category: text(CATEGORY),
            purchase_price: coerce_money(cell(PURCHASE_PRICE)),
            bulk_price: coerce_money(cell(BULK_PRICE)),
            bulk_quantity: coerce_count(cell(BULK_QUANTITY)),
            price: coerce_money(cell(PRICE)),
            profit_margin: optional_text(PROFIT_MARGIN),
            stock: coerce_count(cell(STOCK)),
            location: text(LOCATION),
            supplier: text(SUPPLIER),
            image_path: text(IMAGE_PATH),
            notes: text(NOTES),
            expiry_date: optional_text(EXPIRY_DATE),
        }
    }
}

/// Renders a product as cell text in [`PRODUCT_LABELS`] order.
pub fn product_to_row(product: &Product) -> [Option<String>; FIELD_COUNT] {
    let money = |m: Option<Money>| m.map(|m| m.to_decimal_string());
    let mut row: [Option<String>; FIELD_COUNT] = Default::default();

    row[CATEGORY] = Some(product.category.clone());
    row[ID] = Some(product.id.clone());
    row[NAME] = Some(product.name.clone());
    row[BARCODE] = Some(product.barcode.clone());
    row[BULK_PRICE] = money(product.bulk_price);
    row[BULK_QUANTITY] = Some(product.bulk_quantity.to_string());
    row[PURCHASE_PRICE] = money(product.purchase_price);
    row[PRICE] = money(product.price);
    row[PROFIT_MARGIN] = product.profit_margin.clone();
    row[STOCK] = Some(product.stock.to_string());
    row[LOCATION] = Some(product.location.clone());
    row[SUPPLIER] = Some(product.supplier.clone());
    row[IMAGE_PATH] = Some(product.image_path.clone());
    row[NOTES] = Some(product.notes.clone());
    row[EXPIRY_DATE] = product.expiry_date.clone();
    row
}

// =============================================================================
// Coercion
// =============================================================================

/// Coerces cell text to a whole count.
///
/// Integers parse as-is; finite decimals truncate toward zero; anything else
/// (empty, NULL, garbage, NaN) is 0.
pub fn coerce_count(value: Option<&str>) -> i64 {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return 0;
    };
    if let Ok(n) = raw.parse::<i64>() {
        return n;
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() && f.abs() < i64::MAX as f64 => f.trunc() as i64,
        _ => 0,
    }
}

/// Coerces cell text to a money amount; invalid or empty cells are `None`.
pub fn coerce_money(value: Option<&str>) -> Option<Money> {
    value.and_then(Money::parse_decimal)
}

/// Barcodes that went through a numeric column come back as `"123.0"`.
fn normalize_barcode(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.strip_suffix(".0") {
        Some(digits) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
            digits.to_string()
        }
        _ => trimmed.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    #[test]
    fn test_label_tables_are_inverse() {
        for (localized, internal) in PRODUCT_LABELS {
            assert_eq!(localize(internal), Some(localized));
            assert_eq!(internalize(localized), Some(internal));
        }
        assert_eq!(localized_columns().count(), FIELD_COUNT);
        assert_eq!(localized_columns().last(), Some("expiry_date"));
    }

    #[test]
    fn test_detect_localized() {
        let columns: Vec<&str> = localized_columns().collect();
        let adapter = SchemaAdapter::detect(&columns);
        assert_eq!(adapter.label_set(), LabelSet::Localized);
        assert!(adapter.missing_fields().is_empty());
    }

    #[test]
    fn test_detect_internal_with_missing_fields() {
        let adapter = SchemaAdapter::detect(&["id", "barcode", "name", "price", "stock"]);
        assert_eq!(adapter.label_set(), LabelSet::Internal);
        assert!(adapter.missing_fields().contains(&"supplier"));

        let product = adapter.product_from_row(&cells(&["p-1", "123", "Cola", "3", "7"]));
        assert_eq!(product.id, "p-1");
        assert_eq!(product.barcode, "123");
        assert_eq!(product.price, Some(Money::from_cents(300)));
        assert_eq!(product.stock, 7);
        assert_eq!(product.supplier, "");
        assert_eq!(product.bulk_quantity, 0);
        assert_eq!(product.expiry_date, None);
    }

    #[test]
    fn test_row_round_trip() {
        let product = Product {
            id: "p-9".to_string(),
            barcode: "6909876543210".to_string(),
            name: "方便面".to_string(),
            category: "食品".to_string(),
            purchase_price: Some(Money::from_cents(150)),
            bulk_price: Some(Money::from_cents(3000)),
            bulk_quantity: 20,
            price: Some(Money::from_cents(400)),
            profit_margin: Some("62.5%".to_string()),
            stock: 30,
            location: "货架 B2".to_string(),
            supplier: "".to_string(),
            image_path: "".to_string(),
            notes: "".to_string(),
            expiry_date: Some("2026-12-31".to_string()),
        };

        let columns: Vec<&str> = localized_columns().collect();
        let adapter = SchemaAdapter::detect(&columns);
        let row = product_to_row(&product);
        assert_eq!(adapter.product_from_row(&row), product);
    }

    #[test]
    fn test_coerce_count() {
        assert_eq!(coerce_count(Some("48")), 48);
        assert_eq!(coerce_count(Some(" -3 ")), -3);
        assert_eq!(coerce_count(Some("12.9")), 12);
        assert_eq!(coerce_count(Some("-2.5")), -2);
        assert_eq!(coerce_count(Some("abc")), 0);
        assert_eq!(coerce_count(Some("NaN")), 0);
        assert_eq!(coerce_count(Some("")), 0);
        assert_eq!(coerce_count(None), 0);
    }

    #[test]
    fn test_coerce_money() {
        assert_eq!(coerce_money(Some("2.5")), Some(Money::from_cents(250)));
        assert_eq!(coerce_money(Some("four")), None);
        assert_eq!(coerce_money(None), None);
    }

    #[test]
    fn test_numeric_barcode_is_normalized() {
        assert_eq!(normalize_barcode("6901234567890.0"), "6901234567890");
        assert_eq!(normalize_barcode(" ABC.0 "), "ABC.0");
        assert_eq!(normalize_barcode(""), "");
    }
}
