//! # Ledger Repository
//!
//! Append-only logs: completed checkouts and stock-level changes.
//!
//! ## Tables
//! ```text
//! ┌──────────────────────────────┐    ┌──────────────────────────────────┐
//! │ transactions                 │    │ stock_log                        │
//! │  txn_id   datetime           │    │  log_id   datetime               │
//! │  items (JSON line items)     │    │  barcode  name                   │
//! │  total  paid  change         │    │  change   before  after  type    │
//! │  operator  note              │    │  operator  note                  │
//! └──────────────────────────────┘    └──────────────────────────────────┘
//!        rowid order == append order; rows are never updated
//! ```
//!
//! Unreadable rows (bad JSON, bad timestamp, unknown type tag) are skipped
//! with a warning; they never fail the whole read.

use chrono::NaiveDateTime;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use stockroom_core::{
    LineItem, Money, StockChangeType, StockLogEntry, Transaction, DATETIME_FORMAT,
};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::pool::Database;

// =============================================================================
// Writes
// =============================================================================

/// Appends one transaction row.
pub async fn insert_transaction(conn: &mut SqliteConnection, txn: &Transaction) -> DbResult<()> {
    debug!(txn_id = %txn.txn_id, total = %txn.total, "Appending transaction");

    let items = serde_json::to_string(&txn.items)?;

    sqlx::query(
        r#"
        INSERT INTO transactions (
            txn_id, datetime, items, total, paid, "change", operator, note
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&txn.txn_id)
    .bind(txn.datetime.format(DATETIME_FORMAT).to_string())
    .bind(items)
    .bind(txn.total.to_decimal_string())
    .bind(txn.paid.to_decimal_string())
    .bind(txn.change.to_decimal_string())
    .bind(&txn.operator)
    .bind(&txn.note)
    .execute(&mut *conn)
    .await
    .map_err(DbError::write)?;

    Ok(())
}

/// Appends one stock-log row.
pub async fn insert_stock_log(conn: &mut SqliteConnection, entry: &StockLogEntry) -> DbResult<()> {
    debug!(
        log_id = %entry.log_id,
        barcode = %entry.barcode,
        change = entry.change,
        kind = %entry.change_type,
        "Appending stock log entry"
    );

    sqlx::query(
        r#"
        INSERT INTO stock_log (
            log_id, datetime, barcode, name, "change",
            before_stock, after_stock, "type", operator, note
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&entry.log_id)
    .bind(entry.datetime.format(DATETIME_FORMAT).to_string())
    .bind(&entry.barcode)
    .bind(&entry.name)
    .bind(entry.change)
    .bind(entry.before_stock)
    .bind(entry.after_stock)
    .bind(entry.change_type.as_str())
    .bind(&entry.operator)
    .bind(&entry.note)
    .execute(&mut *conn)
    .await
    .map_err(DbError::write)?;

    Ok(())
}

// =============================================================================
// Reads
// =============================================================================

/// Which slice of a log to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogWindow {
    /// Every row, oldest first.
    All,
    /// The newest `n` rows, newest first.
    Recent(u32),
}

impl LogWindow {
    fn clause(self) -> String {
        match self {
            LogWindow::All => "ORDER BY rowid ASC".to_string(),
            LogWindow::Recent(n) => format!("ORDER BY rowid DESC LIMIT {}", n),
        }
    }
}

/// Reads transactions; rows that cannot be decoded are skipped.
pub async fn fetch_transactions(
    conn: &mut SqliteConnection,
    window: LogWindow,
) -> DbResult<Vec<Transaction>> {
    let sql = format!(
        r#"SELECT txn_id, datetime, items, total, paid, "change" AS change_amount, operator, note
           FROM transactions {}"#,
        window.clause()
    );
    let rows = sqlx::query(&sql)
        .fetch_all(&mut *conn)
        .await
        .map_err(DbError::read)?;

    Ok(rows
        .iter()
        .filter_map(|row| match decode_transaction(row) {
            Ok(txn) => Some(txn),
            Err(reason) => {
                warn!(%reason, "Skipping unreadable transaction row");
                None
            }
        })
        .collect())
}

/// Reads stock-log entries; rows that cannot be decoded are skipped.
pub async fn fetch_stock_log(
    conn: &mut SqliteConnection,
    window: LogWindow,
) -> DbResult<Vec<StockLogEntry>> {
    let sql = format!(
        r#"SELECT log_id, datetime, barcode, name, "change" AS change_qty,
                  before_stock, after_stock, "type" AS change_type, operator, note
           FROM stock_log {}"#,
        window.clause()
    );
    let rows = sqlx::query(&sql)
        .fetch_all(&mut *conn)
        .await
        .map_err(DbError::read)?;

    Ok(rows
        .iter()
        .filter_map(|row| match decode_stock_log(row) {
            Ok(entry) => Some(entry),
            Err(reason) => {
                warn!(%reason, "Skipping unreadable stock log row");
                None
            }
        })
        .collect())
}

// =============================================================================
// Row Decoding
// =============================================================================

fn text(row: &SqliteRow, column: &str) -> Result<String, String> {
    row.try_get::<Option<String>, _>(column)
        .map(Option::unwrap_or_default)
        .map_err(|e| format!("{}: {}", column, e))
}

fn integer(row: &SqliteRow, column: &str) -> Result<i64, String> {
    row.try_get::<i64, _>(column)
        .map_err(|e| format!("{}: {}", column, e))
}

fn timestamp(row: &SqliteRow) -> Result<NaiveDateTime, String> {
    let raw = text(row, "datetime")?;
    NaiveDateTime::parse_from_str(raw.trim(), DATETIME_FORMAT)
        .map_err(|e| format!("datetime '{}': {}", raw, e))
}

fn amount(row: &SqliteRow, column: &str) -> Result<Money, String> {
    let raw = text(row, column)?;
    Money::parse_decimal(&raw).ok_or_else(|| format!("{}: invalid amount '{}'", column, raw))
}

fn decode_transaction(row: &SqliteRow) -> Result<Transaction, String> {
    let txn_id = text(row, "txn_id")?;
    let items_json = text(row, "items")?;
    let items: Vec<LineItem> = serde_json::from_str(&items_json)
        .map_err(|e| format!("items of {}: {}", txn_id, e))?;

    Ok(Transaction {
        datetime: timestamp(row)?,
        items,
        total: amount(row, "total")?,
        paid: amount(row, "paid")?,
        change: amount(row, "change_amount")?,
        operator: text(row, "operator")?,
        note: text(row, "note")?,
        txn_id,
    })
}

fn decode_stock_log(row: &SqliteRow) -> Result<StockLogEntry, String> {
    let change_type = text(row, "change_type")?
        .parse::<StockChangeType>()
        .map_err(|e| e.to_string())?;

    Ok(StockLogEntry {
        log_id: text(row, "log_id")?,
        datetime: timestamp(row)?,
        barcode: text(row, "barcode")?,
        name: text(row, "name")?,
        change: integer(row, "change_qty")?,
        before_stock: integer(row, "before_stock")?,
        after_stock: integer(row, "after_stock")?,
        change_type,
        operator: text(row, "operator")?,
        note: text(row, "note")?,
    })
}

// =============================================================================
// Repository
// =============================================================================

/// Ledger access outside a caller-managed write.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: Database,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(db: Database) -> Self {
        LedgerRepository { db }
    }

    /// Appends one transaction in its own serialized write.
    pub async fn append_transaction(&self, txn: &Transaction) -> DbResult<()> {
        let mut tx = self.db.begin_write().await?;
        tx.append_transaction(txn).await?;
        tx.commit().await
    }

    /// Appends one stock-log entry in its own serialized write.
    pub async fn append_stock_log(&self, entry: &StockLogEntry) -> DbResult<()> {
        let mut tx = self.db.begin_write().await?;
        tx.append_stock_log(entry).await?;
        tx.commit().await
    }

    /// Every transaction, oldest first. Empty on read failure.
    pub async fn read_transactions(&self) -> Vec<Transaction> {
        self.transactions(LogWindow::All).await
    }

    /// Every stock-log entry, oldest first. Empty on read failure.
    pub async fn read_stock_log(&self) -> Vec<StockLogEntry> {
        self.stock_log(LogWindow::All).await
    }

    /// The newest `n` transactions, newest first.
    pub async fn recent_transactions(&self, n: u32) -> Vec<Transaction> {
        self.transactions(LogWindow::Recent(n)).await
    }

    /// The newest `n` stock-log entries, newest first.
    pub async fn recent_stock_log(&self, n: u32) -> Vec<StockLogEntry> {
        self.stock_log(LogWindow::Recent(n)).await
    }

    /// Reads transactions, reporting failures.
    pub async fn try_transactions(&self, window: LogWindow) -> DbResult<Vec<Transaction>> {
        let mut conn = self.db.pool().acquire().await?;
        fetch_transactions(&mut conn, window).await
    }

    /// Reads stock-log entries, reporting failures.
    pub async fn try_stock_log(&self, window: LogWindow) -> DbResult<Vec<StockLogEntry>> {
        let mut conn = self.db.pool().acquire().await?;
        fetch_stock_log(&mut conn, window).await
    }

    async fn transactions(&self, window: LogWindow) -> Vec<Transaction> {
        or_empty(self.try_transactions(window).await, "transactions")
    }

    async fn stock_log(&self, window: LogWindow) -> Vec<StockLogEntry> {
        or_empty(self.try_stock_log(window).await, "stock_log")
    }
}

fn or_empty<T>(result: DbResult<Vec<T>>, table: &str) -> Vec<T> {
    result.unwrap_or_else(|e| {
        warn!(table, error = %e, "Ledger unreadable; returning an empty list");
        Vec::new()
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
