//! # Validation Module
//!
//! Business-rule checks run before anything touches the store.
//!
//! ## Where Validation Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Presentation                                                 │
//! │  ├── Widget constraints (number inputs, required fields)               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: stockroom-pos operations                                     │
//! │  └── THIS MODULE: names, barcodes, quantities, prices                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Catalog checks inside the write transaction                  │
//! │  └── Barcode uniqueness (needs the current catalog)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockroom_core::validation::{validate_barcode, validate_quantity};
//!
//! validate_barcode("6901234567890").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{NewProduct, ProductUpdate};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest barcode accepted (covers EAN-13, UPC, GS1-128 payloads).
pub const MAX_BARCODE_LEN: usize = 64;

/// Longest product name accepted.
pub const MAX_NAME_LEN: usize = 200;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a barcode.
///
/// ## Rules
/// - Empty is allowed (product without a barcode)
/// - At most [`MAX_BARCODE_LEN`] characters after trimming
/// - No whitespace or control characters inside the code
///
/// ## Example
/// ```rust
/// use stockroom_core::validation::validate_barcode;
///
/// assert!(validate_barcode("6901234567890").is_ok());
/// assert!(validate_barcode("").is_ok());
/// assert!(validate_barcode("690 123").is_err());
/// ```
pub fn validate_barcode(barcode: &str) -> ValidationResult<()> {
    let barcode = barcode.trim();

    if barcode.chars().count() > MAX_BARCODE_LEN {
        return Err(ValidationError::TooLong {
            field: "barcode".to_string(),
            max: MAX_BARCODE_LEN,
        });
    }

    if barcode
        .chars()
        .any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: "must not contain spaces".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most [`MAX_NAME_LEN`] characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a cart or stock-movement quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed [`MAX_ITEM_QUANTITY`]
///
/// ```text
///   validate_quantity(qty)
///        │
///        ├── qty <= 0?     → "quantity must be positive"
///        ├── qty > 9999?   → "quantity must be between 1 and 9999"
///        └── OK            → add to cart / move stock
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates an optional money amount: absent or non-negative.
///
/// ```rust
/// use stockroom_core::{validation::validate_price, Money};
///
/// assert!(validate_price("price", Some(Money::from_cents(250))).is_ok());
/// assert!(validate_price("price", None).is_ok());
/// assert!(validate_price("price", Some(Money::from_cents(-1))).is_err());
/// ```
pub fn validate_price(field: &str, amount: Option<Money>) -> ValidationResult<()> {
    match amount {
        Some(m) if m.is_negative() => Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        }),
        _ => Ok(()),
    }
}

/// Validates a count entered on a form (stock, units per pack).
pub fn validate_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a payment amount.
///
/// Zero is accepted; underpayment shows up as negative change.
pub fn validate_payment(paid: Money) -> ValidationResult<()> {
    validate_price("paid", Some(paid))
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates that one more line fits in the cart.
pub fn validate_cart_size(current_lines: usize) -> ValidationResult<()> {
    if current_lines >= MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Product Form Validators
// =============================================================================

/// Validates every field of a new product that can be checked without the
/// catalog. Barcode uniqueness is checked by the editor.
pub fn validate_new_product(draft: &NewProduct) -> ValidationResult<()> {
    validate_product_name(&draft.name)?;
    validate_barcode(&draft.barcode)?;
    validate_price("purchase_price", draft.purchase_price)?;
    validate_price("bulk_price", draft.bulk_price)?;
    validate_price("price", draft.price)?;
    validate_non_negative("bulk_quantity", draft.bulk_quantity)?;
    validate_non_negative("stock", draft.stock)?;
    Ok(())
}

/// Validates the supplied fields of a product update.
pub fn validate_product_update(update: &ProductUpdate) -> ValidationResult<()> {
    if let Some(name) = &update.name {
        validate_product_name(name)?;
    }
    if let Some(barcode) = &update.barcode {
        validate_barcode(barcode)?;
    }
    validate_price("purchase_price", update.purchase_price)?;
    validate_price("bulk_price", update.bulk_price)?;
    validate_price("price", update.price)?;
    if let Some(qty) = update.bulk_quantity {
        validate_non_negative("bulk_quantity", qty)?;
    }
    if let Some(stock) = update.stock {
        validate_non_negative("stock", stock)?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
