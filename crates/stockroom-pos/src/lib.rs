//! # stockroom-pos: Store Operations
//!
//! The operations the presentation layer calls with a user action, returning
//! plain values to render.
//!
//! ## Module Organization
//! ```text
//! stockroom_pos/
//! ├── lib.rs          ◄─── You are here (Stockroom handle, tracing setup)
//! ├── config.rs       ◄─── stockroom.toml + STOCKROOM_* overrides
//! ├── lookup.rs       ◄─── Barcode / name lookups
//! ├── inventory.rs    ◄─── Stock mutator + warehouse form
//! ├── checkout.rs     ◄─── Cart → stock decrements + transaction
//! ├── editor.rs       ◄─── Product create / update / delete
//! └── error.rs        ◄─── PosError + presentation error codes
//! ```
//!
//! ## Component Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   LookupService ─────────┐          CatalogEditor ──────┐               │
//! │        ▲                 │                              │               │
//! │        │ resolve         ▼                              ▼               │
//! │   Warehouse ──► StockMutator ──► Catalog Store ◄── begin_write()        │
//! │                      ▲               │                                  │
//! │                      │               ▼                                  │
//! │   CheckoutOrchestrator ─────────► Ledger Store                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use stockroom_core::{Cart, Money};
//! use stockroom_pos::{init_tracing, PosConfig, Stockroom};
//!
//! init_tracing();
//! let store = Stockroom::open(&PosConfig::load_or_default(None)).await?;
//!
//! let mut cart = Cart::new();
//! store.scan_into_cart(&mut cart, "6901234567890", 2).await?;
//! let txn = store.checkout_cart(&mut cart, Money::from_cents(1000), None).await?;
//! ```

pub mod checkout;
pub mod config;
pub mod editor;
pub mod error;
pub mod inventory;
pub mod lookup;

pub use checkout::CheckoutOrchestrator;
pub use config::{CheckoutPolicy, PosConfig};
pub use editor::CatalogEditor;
pub use error::{ErrorCode, ErrorReport, PosError, PosResult};
pub use inventory::{StockAdjustment, StockMutator, Warehouse};
pub use lookup::LookupService;

use chrono::{Local, NaiveDateTime, Timelike};
use stockroom_core::{Cart, LineItem, Money, Product, StockLogEntry, Transaction};
use stockroom_db::Database;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,stockroom=debug,sqlx=warn";

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=stockroom_pos=trace` - Trace the operations layer only
/// - Default: [`DEFAULT_LOG_FILTER`]
///
/// Calling it again is harmless; only the first subscriber is installed.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Ledger timestamp: local wall clock, whole seconds.
pub(crate) fn now() -> NaiveDateTime {
    let ts = Local::now().naive_local();
    ts.with_nanosecond(0).unwrap_or(ts)
}

// =============================================================================
// Stockroom Handle
// =============================================================================

/// An open store with every operation wired to it.
///
/// Cheap to clone; clones share the database.
#[derive(Debug, Clone)]
pub struct Stockroom {
    db: Database,
    config: PosConfig,
    lookup: LookupService,
    stock: StockMutator,
    warehouse: Warehouse,
    checkout: CheckoutOrchestrator,
    editor: CatalogEditor,
}

impl Stockroom {
    /// Opens (creating and seeding if needed) the store named by `config`.
    pub async fn open(config: &PosConfig) -> PosResult<Self> {
        config.validate()?;
        let db = Database::new(config.db_config()).await?;
        info!(
            path = %config.database_path().display(),
            policy = %config.checkout.policy,
            "Stockroom opened"
        );
        Ok(Self::with_database(db, config.clone()))
    }

    /// Wires the operations to an already open database.
    pub fn with_database(db: Database, config: PosConfig) -> Self {
        let lookup = LookupService::from_config(db.clone(), &config);
        let stock = StockMutator::new(db.clone());
        let warehouse = Warehouse::new(
            stock.clone(),
            lookup.clone(),
            config.warehouse.operator.clone(),
        );
        let checkout = CheckoutOrchestrator::from_config(db.clone(), &config);
        let editor = CatalogEditor::new(db.clone());

        Stockroom {
            db,
            config,
            lookup,
            stock,
            warehouse,
            checkout,
            editor,
        }
    }

    pub fn config(&self) -> &PosConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn lookup(&self) -> &LookupService {
        &self.lookup
    }

    pub fn stock(&self) -> &StockMutator {
        &self.stock
    }

    pub fn warehouse(&self) -> &Warehouse {
        &self.warehouse
    }

    pub fn checkout(&self) -> &CheckoutOrchestrator {
        &self.checkout
    }

    pub fn editor(&self) -> &CatalogEditor {
        &self.editor
    }

    /// The whole catalog, or empty if it cannot be read.
    pub async fn products(&self) -> Vec<Product> {
        self.db.catalog().load().await
    }

    /// Resolves a scan or typed name and appends it to `cart`.
    pub async fn scan_into_cart(
        &self,
        cart: &mut Cart,
        input: &str,
        qty: i64,
    ) -> PosResult<LineItem> {
        let product = self
            .lookup
            .resolve(input)
            .await
            .ok_or_else(|| PosError::ProductNotFound(input.trim().to_string()))?;
        Ok(cart.add_item(&product, qty)?.clone())
    }

    /// Checks out with the configured operator unless one is given.
    pub async fn checkout_cart(
        &self,
        cart: &mut Cart,
        paid: Money,
        operator: Option<&str>,
    ) -> PosResult<Transaction> {
        let operator = operator.unwrap_or(&self.config.checkout.operator);
        self.checkout.checkout(cart, paid, operator).await
    }

    /// Every recorded transaction, oldest first.
    pub async fn transactions(&self) -> Vec<Transaction> {
        self.db.ledger().read_transactions().await
    }

    /// Every stock-log entry, oldest first.
    pub async fn stock_log(&self) -> Vec<StockLogEntry> {
        self.db.ledger().read_stock_log().await
    }

    /// The newest `n` transactions, newest first.
    pub async fn recent_transactions(&self, n: u32) -> Vec<Transaction> {
        self.db.ledger().recent_transactions(n).await
    }

    /// The newest `n` stock-log entries, newest first.
    pub async fn recent_stock_log(&self, n: u32) -> Vec<StockLogEntry> {
        self.db.ledger().recent_stock_log(n).await
    }

    pub async fn close(&self) {
        self.db.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_core::StockChangeType;

    fn config_in(dir: &tempfile::TempDir) -> PosConfig {
        let mut config = PosConfig::default();
        config.store.path = Some(dir.path().join("shop").join("stockroom.db"));
        config
    }

    #[test]
    fn test_init_tracing_twice() {
        init_tracing();
        init_tracing();
    }

    #[test]
    fn test_now_has_whole_seconds() {
        assert_eq!(now().nanosecond(), 0);
    }

    #[tokio::test]
    async fn test_open_seeds_new_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = Stockroom::open(&config_in(&dir)).await.unwrap();

        let products = store.products().await;
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].barcode, "6901234567890");
        assert_eq!(products[0].price, Some(Money::from_cents(250)));
        assert_eq!(products[1].name, "方便面");
        assert!(store.transactions().await.is_empty());
        assert!(store.stock_log().await.is_empty());
        store.close().await;
    }

    #[tokio::test]
    async fn test_scan_checkout_and_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = Stockroom::open(&config_in(&dir)).await.unwrap();

        let mut cart = Cart::new();
        let line = store
            .scan_into_cart(&mut cart, "6901234567890", 2)
            .await
            .unwrap();
        assert_eq!(line.subtotal, Money::from_cents(500));
        store.scan_into_cart(&mut cart, "方便面", 1).await.unwrap();
        assert!(matches!(
            store.scan_into_cart(&mut cart, "", 1).await,
            Err(PosError::ProductNotFound(_))
        ));

        let txn = store
            .checkout_cart(&mut cart, Money::from_cents(1000), None)
            .await
            .unwrap();
        assert_eq!(txn.total, Money::from_cents(900));
        assert_eq!(txn.change, Money::from_cents(100));
        assert_eq!(txn.operator, "cashier");
        assert_eq!(txn.note, "POS checkout");

        store
            .warehouse()
            .receive("6909876543210", 10, None, "delivery")
            .await
            .unwrap();

        let recent = store.recent_stock_log(2).await;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].change_type, StockChangeType::In);
        assert_eq!(recent[1].change_type, StockChangeType::Sale);
        assert_eq!(store.recent_transactions(10).await, vec![txn]);
        store.close().await;
    }

    #[tokio::test]
    async fn test_reopen_keeps_state_without_reseeding() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);

        let store = Stockroom::open(&config).await.unwrap();
        store.editor().delete_product("6901234567890").await.unwrap();
        store.close().await;

        let store = Stockroom::open(&config).await.unwrap();
        let products = store.products().await;
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].barcode, "6909876543210");
        store.close().await;
    }

    #[tokio::test]
    async fn test_open_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(&dir);
        config.lookup.name_limit = 0;
        assert!(matches!(
            Stockroom::open(&config).await,
            Err(PosError::Config(_))
        ));
    }
}
