//! # stockroom-core: Pure Business Logic for Stockroom
//!
//! This crate holds the inventory ledger rules as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Presentation (external collaborator)               │   │
//! │  │    Scan box ──► Cart view ──► Checkout ──► Stock forms          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    stockroom-pos                                │   │
//! │  │    adjust_stock, checkout, add_product, search, etc.           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ stockroom-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  types  │ │  money  │ │  cart   │ │ schema  │ │ lookup  │  │   │
//! │  │   │ Product │ │  Money  │ │  Cart   │ │ labels  │ │ matcher │  │   │
//! │  │   │ Ledger  │ │ decimal │ │LineItem │ │ coerce  │ │ ranking │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  stockroom-db (Database Layer)                  │   │
//! │  │        products / transactions / stock_log in one SQLite file   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Transaction, StockLogEntry, etc.)
//! - [`money`] - Money type with integer arithmetic and exact decimal parsing
//! - [`cart`] - Session-scoped cart and line items
//! - [`schema`] - Localized/internal label sets and value coercion
//! - [`lookup`] - Barcode and name resolution with pluggable matchers
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use stockroom_core::money::Money;
//!
//! let price = Money::parse_decimal("2.5").unwrap();
//! assert_eq!(price.cents(), 250);
//! assert_eq!(price.checked_mul_quantity(2).unwrap().to_decimal_string(), "5.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod lookup;
pub mod money;
pub mod schema;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::Cart;
pub use error::{CoreError, CoreResult, ValidationError};
pub use lookup::{NameMatcher, SubstringMatcher};
pub use money::Money;
pub use schema::SchemaAdapter;
pub use types::*;

#[cfg(feature = "fuzzy")]
pub use lookup::FuzzyMatcher;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single cart.
///
/// ## Business Reason
/// A till session rarely passes a few dozen lines; anything past this is a
/// stuck scanner repeating the same code.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity on a single cart line or stock movement.
///
/// ## Business Reason
/// Catches a scanner or keypad slip (typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 9999;

/// Default number of results for a name lookup.
pub const DEFAULT_NAME_LIMIT: usize = 5;

/// Timestamp format used for every ledger row.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
