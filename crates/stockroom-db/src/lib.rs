//! # stockroom-db: Database Layer for Stockroom
//!
//! Persistence for the inventory ledger: one SQLite file holding the product
//! catalog, the transaction log and the stock-change log.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Data Flow                              │
//! │                                                                         │
//! │  stockroom-pos (adjust_stock, checkout, add_product, ...)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   stockroom-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │   │   │
//! │  │   │               │    │ Catalog       │    │ 001_inventory│   │   │
//! │  │   │ SqlitePool    │◄───│ Ledger        │    │   _ledger    │   │   │
//! │  │   │ writer Mutex  │    │ WriteTx       │    │              │   │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘   │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  SQLite: products | transactions | stock_log                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, configuration and the writer lock
//! - [`migrations`] - Embedded database migrations
//! - [`bootstrap`] - Sample catalog for a newly created store
//! - [`error`] - Database error types
//! - [`repository`] - Catalog, ledger and write-transaction access
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockroom_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("stockroom.db")).await?;
//!
//! let mut tx = db.begin_write().await?;
//! let mut products = tx.load_products().await?;
//! products[0].stock -= 1;
//! tx.save_products(&products).await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod bootstrap;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::catalog::CatalogRepository;
pub use repository::ledger::{LedgerRepository, LogWindow};
pub use repository::write::WriteTx;
