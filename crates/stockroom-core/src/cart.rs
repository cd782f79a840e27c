//! # Cart
//!
//! Session-scoped list of line items waiting for checkout.
//!
//! The cart never touches the store. Each line freezes the product's barcode,
//! name and price at the moment it was added; checkout then walks the lines in
//! order.
//!
//! ```text
//!  scan / name ──► Cart::add_item ──► lines.push(LineItem)
//!                        │
//!  checkout ◄────────────┘  lines in insertion order, then clear()
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{amount_out_of_range, LineItem, Product};
use crate::validation::{validate_cart_size, validate_quantity};

/// The shopping cart.
///
/// ## Invariants
/// - Lines are append-only; scanning the same product twice yields two lines
/// - Every line has `qty > 0` and `subtotal == price * qty`
/// - The sum of subtotals fits in an amount, so [`Cart::total`] cannot overflow
/// - At most [`crate::MAX_CART_ITEMS`] lines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<LineItem>,
}

impl Cart {
    /// Creates an empty cart.
    pub fn new() -> Self {
        Cart { lines: Vec::new() }
    }

    /// Appends a line for `qty` units of `product`.
    ///
    /// ## Returns
    /// The line that was added.
    ///
    /// ## Errors
    /// [`ValidationError::OutOfRange`] when the line's subtotal or the new
    /// cart total would not fit in an amount. The cart is left unchanged.
    pub fn add_item(&mut self, product: &Product, qty: i64) -> Result<&LineItem, ValidationError> {
        validate_quantity(qty)?;
        validate_cart_size(self.lines.len())?;

        let line = LineItem::from_product(product, qty)?;
        self.total()
            .checked_add(line.subtotal)
            .ok_or_else(|| amount_out_of_range("total"))?;

        self.lines.push(line);
        Ok(&self.lines[self.lines.len() - 1])
    }

    /// Removes the line at `index`, if any.
    pub fn remove_line(&mut self, index: usize) -> Option<LineItem> {
        (index < self.lines.len()).then(|| self.lines.remove(index))
    }

    /// Lines in insertion order.
    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of line subtotals.
    pub fn total(&self) -> Money {
        self.lines.iter().map(|line| line.subtotal).sum()
    }

    /// Empties the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
