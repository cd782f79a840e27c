//! # Serialized Write Transaction
//!
//! Every mutation of the store is one read → modify → write cycle. [`WriteTx`]
//! holds the database-wide writer lock and an open SQLite transaction for the
//! whole cycle.
//!
//! ```text
//!  begin_write()
//!     │  lock writer mutex (waits for the previous writer)
//!     │  BEGIN
//!     ▼
//!  load_products ──► mutate in memory ──► save_products
//!                                         append_stock_log
//!                                         append_transaction
//!     │
//!     ├── commit()        → COMMIT, unlock
//!     └── dropped / error → ROLLBACK, unlock
//! ```
//!
//! Reads inside the cycle must go through the `WriteTx` itself; the pool may
//! have a single connection and it is held here.

use std::sync::Arc;

use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use stockroom_core::{Product, StockLogEntry, Transaction};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{catalog, ledger};

/// An open, exclusive write transaction.
///
/// Field order matters: the SQLite transaction is dropped (rolled back)
/// before the writer lock is released.
pub struct WriteTx {
    tx: sqlx::Transaction<'static, Sqlite>,
    _writer: OwnedMutexGuard<()>,
}

impl std::fmt::Debug for WriteTx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteTx").finish_non_exhaustive()
    }
}

impl WriteTx {
    pub(crate) async fn begin(pool: &SqlitePool, writer: Arc<Mutex<()>>) -> DbResult<Self> {
        let guard = writer.lock_owned().await;
        let tx = pool.begin().await.map_err(DbError::write)?;
        debug!("Write transaction started");
        Ok(WriteTx { tx, _writer: guard })
    }

    /// The transaction's connection, for queries not covered below.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    /// Reads the catalog as seen by this transaction. Failures propagate.
    pub async fn load_products(&mut self) -> DbResult<Vec<Product>> {
        catalog::load_products(&mut self.tx).await
    }

    /// Replaces the catalog.
    pub async fn save_products(&mut self, products: &[Product]) -> DbResult<()> {
        catalog::save_products(&mut self.tx, products).await
    }

    /// Appends a stock-log entry.
    pub async fn append_stock_log(&mut self, entry: &StockLogEntry) -> DbResult<()> {
        ledger::insert_stock_log(&mut self.tx, entry).await
    }

    /// Appends a transaction record.
    pub async fn append_transaction(&mut self, txn: &Transaction) -> DbResult<()> {
        ledger::insert_transaction(&mut self.tx, txn).await
    }

    /// Commits everything written through this transaction.
    pub async fn commit(self) -> DbResult<()> {
        self.tx.commit().await.map_err(DbError::write)?;
        debug!("Write transaction committed");
        Ok(())
    }

    /// Discards everything written through this transaction.
    pub async fn rollback(self) -> DbResult<()> {
        self.tx.rollback().await.map_err(DbError::write)?;
        debug!("Write transaction rolled back");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};
    use stockroom_core::{Money, Product};

    fn product(barcode: &str, stock: i64) -> Product {
        Product {
            id: format!("id-{}", barcode),
            barcode: barcode.to_string(),
            name: format!("Item {}", barcode),
            price: Some(Money::from_cents(100)),
            stock,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_commit_persists() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut tx = db.begin_write().await.unwrap();
        tx.save_products(&[product("A", 5)]).await.unwrap();
        assert_eq!(tx.load_products().await.unwrap().len(), 1);
        tx.commit().await.unwrap();

        assert_eq!(db.catalog().try_load().await.unwrap()[0].stock, 5);
    }

    #[tokio::test]
    async fn test_drop_rolls_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.catalog().save(&[product("A", 5)]).await.unwrap();

        {
            let mut tx = db.begin_write().await.unwrap();
            tx.save_products(&[product("A", 99), product("B", 1)])
                .await
                .unwrap();
        }
        let mut tx = db.begin_write().await.unwrap();
        let products = tx.load_products().await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(products, vec![product("A", 5)]);
    }

    #[tokio::test]
    async fn test_writers_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("serial.db")).seed_if_created(false);
        let db = Database::new(config).await.unwrap();
        db.catalog().save(&[product("A", 0)]).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                let mut tx = db.begin_write().await.unwrap();
                let mut products = tx.load_products().await.unwrap();
                products[0].stock += 1;
                tx.save_products(&products).await.unwrap();
                tx.commit().await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(db.catalog().try_load().await.unwrap()[0].stock, 8);
        db.close().await;
    }
}
