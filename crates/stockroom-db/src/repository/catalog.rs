//! # Catalog Repository
//!
//! Loads and persists the product catalog as a whole.
//!
//! ## Load / Save Cycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  load_products(conn)                                                   │
//! │    1. locate table: "products", else legacy "商品信息"                  │
//! │    2. pragma_table_info → column names → SchemaAdapter::detect         │
//! │    3. SELECT CAST(col AS TEXT) ... ORDER BY rowid                      │
//! │    4. adapter.product_from_row(cells) per row                          │
//! │                                                                         │
//! │  save_products(conn, products)                                         │
//! │    1. DROP + CREATE "products" with the localized columns              │
//! │    2. INSERT every product in catalog order                            │
//! │    3. drop the legacy table (its rows now live in "products")          │
//! │                                                                         │
//! │  transactions / stock_log are never touched here                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The free functions take a connection so they can run inside a
//! [`WriteTx`](super::write::WriteTx); [`CatalogRepository`] wraps them for
//! callers outside a write.

use sqlx::{Row, SqliteConnection};
use stockroom_core::schema::{self, SchemaAdapter, FIELD_COUNT};
use stockroom_core::Product;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::Database;

/// Current products table name.
pub const PRODUCTS_TABLE: &str = "products";

/// Table name used by stores written before the rename.
pub const LEGACY_PRODUCTS_TABLE: &str = "商品信息";

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

async fn table_exists(conn: &mut SqliteConnection, name: &str) -> DbResult<bool> {
    let found: Option<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1")
            .bind(name)
            .fetch_optional(&mut *conn)
            .await
            .map_err(DbError::read)?;
    Ok(found.is_some())
}

async fn row_count(conn: &mut SqliteConnection, table: &str) -> DbResult<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
    sqlx::query_scalar(&sql)
        .fetch_one(&mut *conn)
        .await
        .map_err(DbError::read)
}

/// Picks the table holding the catalog.
///
/// `products` wins unless it is empty and a legacy table still holds rows.
pub async fn locate_products_table(conn: &mut SqliteConnection) -> DbResult<Option<&'static str>> {
    let current = table_exists(conn, PRODUCTS_TABLE).await?;
    let legacy = table_exists(conn, LEGACY_PRODUCTS_TABLE).await?;

    let table = match (current, legacy) {
        (true, true) => {
            if row_count(conn, PRODUCTS_TABLE).await? == 0 {
                LEGACY_PRODUCTS_TABLE
            } else {
                PRODUCTS_TABLE
            }
        }
        (true, false) => PRODUCTS_TABLE,
        (false, true) => LEGACY_PRODUCTS_TABLE,
        (false, false) => return Ok(None),
    };
    Ok(Some(table))
}

/// Reads the full catalog in stored order.
///
/// A missing table is an empty catalog. Cells are coerced by the schema
/// adapter, so bad values degrade to defaults rather than failing the load.
pub async fn load_products(conn: &mut SqliteConnection) -> DbResult<Vec<Product>> {
    let Some(table) = locate_products_table(conn).await? else {
        debug!("No products table present");
        return Ok(Vec::new());
    };

    let columns: Vec<String> =
        sqlx::query_scalar("SELECT name FROM pragma_table_info(?1) ORDER BY cid")
            .bind(table)
            .fetch_all(&mut *conn)
            .await
            .map_err(DbError::read)?;
    if columns.is_empty() {
        return Ok(Vec::new());
    }

    let adapter = SchemaAdapter::detect(&columns);
    let missing = adapter.missing_fields();
    if !missing.is_empty() {
        debug!(table, ?missing, "Products table lacks some fields; using defaults");
    }

    let select_list = columns
        .iter()
        .map(|c| format!("CAST({} AS TEXT)", quote_ident(c)))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {} FROM {} ORDER BY rowid",
        select_list,
        quote_ident(table)
    );

    let rows = sqlx::query(&sql)
        .fetch_all(&mut *conn)
        .await
        .map_err(DbError::read)?;

    let mut products = Vec::with_capacity(rows.len());
    for row in rows {
        let cells = (0..columns.len())
            .map(|i| row.try_get::<Option<String>, _>(i))
            .collect::<Result<Vec<_>, _>>()
            .map_err(DbError::read)?;
        products.push(adapter.product_from_row(&cells));
    }

    debug!(table, count = products.len(), label_set = ?adapter.label_set(), "Catalog loaded");
    Ok(products)
}

/// Replaces the stored catalog with `products`.
///
/// Always writes the localized label set in its fixed column order.
pub async fn save_products(conn: &mut SqliteConnection, products: &[Product]) -> DbResult<()> {
    let columns: Vec<String> = schema::localized_columns().map(quote_ident).collect();

    let create = format!(
        "CREATE TABLE {} ({})",
        quote_ident(PRODUCTS_TABLE),
        columns
            .iter()
            .map(|c| format!("{} TEXT", c))
            .collect::<Vec<_>>()
            .join(", ")
    );
    let insert = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(PRODUCTS_TABLE),
        columns.join(", "),
        (1..=FIELD_COUNT)
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ")
    );

    sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(PRODUCTS_TABLE)))
        .execute(&mut *conn)
        .await
        .map_err(DbError::write)?;
    sqlx::query(&create)
        .execute(&mut *conn)
        .await
        .map_err(DbError::write)?;

    for product in products {
        let mut query = sqlx::query(&insert);
        for cell in schema::product_to_row(product) {
            query = query.bind(cell);
        }
        query.execute(&mut *conn).await.map_err(DbError::write)?;
    }

    sqlx::query(&format!(
        "DROP TABLE IF EXISTS {}",
        quote_ident(LEGACY_PRODUCTS_TABLE)
    ))
    .execute(&mut *conn)
    .await
    .map_err(DbError::write)?;

    debug!(count = products.len(), "Catalog written");
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Catalog access outside a write transaction.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    db: Database,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(db: Database) -> Self {
        CatalogRepository { db }
    }

    /// Reads the catalog, degrading to an empty list on any failure.
    pub async fn load(&self) -> Vec<Product> {
        match self.try_load().await {
            Ok(products) => products,
            Err(e) => {
                warn!(error = %e, "Catalog unreadable; continuing with an empty catalog");
                Vec::new()
            }
        }
    }

    /// Reads the catalog, reporting failures.
    pub async fn try_load(&self) -> DbResult<Vec<Product>> {
        let mut conn = self.db.pool().acquire().await?;
        load_products(&mut conn).await
    }

    /// Persists the full catalog in one serialized write.
    pub async fn save(&self, products: &[Product]) -> DbResult<()> {
        let mut tx = self.db.begin_write().await?;
        tx.save_products(products).await?;
        tx.commit().await?;
        info!(count = products.len(), "Catalog saved");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbConfig;
    use stockroom_core::{Money, StockChangeType, StockLogEntry};

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn sample(barcode: &str, name: &str, stock: i64) -> Product {
        Product {
            id: format!("id-{}", barcode),
            barcode: barcode.to_string(),
            name: name.to_string(),
            price: Some(Money::from_cents(250)),
            stock,
            ..Default::default()
        }
    }

    async fn exec(db: &Database, sql: &str) {
        sqlx::query(sql).execute(db.pool()).await.unwrap();
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips_every_field() {
        let db = setup().await;
        let full = Product {
            id: "p-1".to_string(),
            barcode: "6901234567890".to_string(),
            name: "矿泉水 500ml".to_string(),
            category: "饮料".to_string(),
            purchase_price: Some(Money::from_cents(100)),
            bulk_price: Some(Money::from_cents(2000)),
            bulk_quantity: 24,
            price: Some(Money::from_cents(250)),
            profit_margin: Some("60%".to_string()),
            stock: 50,
            location: "货架 A1".to_string(),
            supplier: "Acme".to_string(),
            image_path: "img/water.png".to_string(),
            notes: "chilled".to_string(),
            expiry_date: Some("2027-01-01".to_string()),
        };
        let products = vec![full, sample("6909876543210", "方便面", 30)];

        db.catalog().save(&products).await.unwrap();
        assert_eq!(db.catalog().try_load().await.unwrap(), products);
    }

    #[tokio::test]
    async fn test_save_writes_localized_columns_in_order() {
        let db = setup().await;
        db.catalog().save(&[sample("1", "A", 1)]).await.unwrap();

        let columns: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_table_info('products') ORDER BY cid")
                .fetch_all(db.pool())
                .await
                .unwrap();
        let expected: Vec<String> = schema::localized_columns().map(String::from).collect();
        assert_eq!(columns, expected);
    }

    #[tokio::test]
    async fn test_save_leaves_ledger_untouched() {
        let db = setup().await;
        let entry = StockLogEntry::record(
            "1",
            "A",
            0,
            5,
            StockChangeType::In,
            "warehouse",
            "",
            chrono::NaiveDate::from_ymd_opt(2026, 3, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        );
        db.ledger().append_stock_log(&entry).await.unwrap();

        db.catalog().save(&[sample("1", "A", 5)]).await.unwrap();
        db.catalog().save(&[]).await.unwrap();

        assert_eq!(db.ledger().read_stock_log().await, vec![entry]);
        assert!(db.catalog().load().await.is_empty());
    }

    #[tokio::test]
    async fn test_internal_labels_with_bad_cells_are_coerced() {
        let db = setup().await;
        exec(&db, "DROP TABLE products").await;
        exec(
            &db,
            "CREATE TABLE products \
             (id TEXT, barcode, name TEXT, price TEXT, stock, bulk_quantity TEXT)",
        )
        .await;
        exec(
            &db,
            "INSERT INTO products VALUES ('a', 6901234567890, 'Cola', 'n/a', 12.7, NULL)",
        )
        .await;

        let products = db.catalog().try_load().await.unwrap();
        assert_eq!(products.len(), 1);
        let cola = &products[0];
        assert_eq!(cola.barcode, "6901234567890");
        assert_eq!(cola.price, None);
        assert_eq!(cola.stock, 12);
        assert_eq!(cola.bulk_quantity, 0);
        assert_eq!(cola.category, "");
    }

    #[tokio::test]
    async fn test_legacy_table_is_read_then_migrated_on_save() {
        let db = setup().await;
        exec(&db, "DROP TABLE products").await;
        exec(
            &db,
            "CREATE TABLE \"商品信息\" \
             (\"序号\" TEXT, \"商品名称\" TEXT, \"条形码\" TEXT, \"销售价\" TEXT, \"库存\" TEXT)",
        )
        .await;
        exec(
            &db,
            "INSERT INTO \"商品信息\" VALUES ('x', '方便面', '6909876543210', '4', '30')",
        )
        .await;

        let products = db.catalog().try_load().await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "方便面");
        assert_eq!(products[0].price, Some(Money::from_cents(400)));

        db.catalog().save(&products).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        assert!(!table_exists(&mut conn, LEGACY_PRODUCTS_TABLE).await.unwrap());
        assert_eq!(
            locate_products_table(&mut conn).await.unwrap(),
            Some(PRODUCTS_TABLE)
        );
        drop(conn);
        assert_eq!(db.catalog().try_load().await.unwrap(), products);
    }

    #[tokio::test]
    async fn test_missing_table_is_empty_catalog() {
        let db = setup().await;
        exec(&db, "DROP TABLE products").await;
        assert!(db.catalog().try_load().await.unwrap().is_empty());
        assert!(db.catalog().load().await.is_empty());
    }
}
