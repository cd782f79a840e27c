//! # Database Pool Management
//!
//! Connection pool creation, first-run bootstrap and the writer lock.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Handle                                    │
//! │                                                                         │
//! │  DbConfig::new(path)                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await                                           │
//! │       │  file existed?  ──no──►  create + migrate + seed two products   │
//! │       ▼                                                                 │
//! │  ┌──────────────────────────────┐   ┌──────────────────────────────┐   │
//! │  │         SqlitePool            │   │   writer: Mutex<()>          │   │
//! │  │  reads: any connection        │   │   one WriteTx at a time      │   │
//! │  └──────────────────────────────┘   └──────────────────────────────┘   │
//! │                                                                         │
//! │  db.catalog()   ──► CatalogRepository  (load / try_load / save)        │
//! │  db.ledger()    ──► LedgerRepository   (append / read / recent)        │
//! │  db.begin_write() ──► WriteTx          (read-modify-write, commit)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled so readers don't block
//! the writer and the writer doesn't block readers.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::bootstrap;
use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::catalog::CatalogRepository;
use crate::repository::ledger::LedgerRepository;
use crate::repository::write::WriteTx;

/// Path value that selects a private in-memory database.
pub const IN_MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust
/// use stockroom_db::DbConfig;
///
/// let config = DbConfig::new("/var/lib/stockroom/stockroom.db")
///     .max_connections(4)
///     .seed_if_created(false);
/// assert!(!config.is_in_memory());
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// How long to wait for a free connection.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,

    /// Whether a freshly created file gets the two sample products.
    /// Default: true
    pub seed_if_created: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    /// The file is created on first open if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
            seed_if_created: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Sets whether a newly created database gets sample products.
    pub fn seed_if_created(mut self, seed: bool) -> Self {
        self.seed_if_created = seed;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// Never seeded; tests start from an empty catalog.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY_PATH),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            run_migrations: true,
            seed_if_created: false,
        }
    }

    /// Whether this configuration points at an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.database_path == Path::new(IN_MEMORY_PATH)
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cheap to clone; clones share the pool and the writer lock.
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,

    /// Serializes every read-modify-write of the store.
    writer: Arc<Mutex<()>>,
}

impl Database {
    /// Opens (or creates) the database.
    ///
    /// ## What This Does
    /// 1. Notes whether the file already exists
    /// 2. Configures SQLite: WAL journal, NORMAL synchronous
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    /// 5. Seeds the sample catalog when the file was just created
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let created = !config.is_in_memory() && !config.database_path.exists();

        let connect_options = if config.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            if let Some(parent) = config.database_path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
                }
            }
            SqliteConnectOptions::new()
                .filename(&config.database_path)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .create_if_missing(true)
        };

        debug!(created, "Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database {
            pool,
            writer: Arc::new(Mutex::new(())),
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        if created && config.seed_if_created {
            let mut tx = db.begin_write().await?;
            bootstrap::seed(tx.conn()).await?;
            tx.commit().await?;
            info!("New database seeded with sample products");
        }

        Ok(db)
    }

    /// Runs database migrations. Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the catalog repository.
    pub fn catalog(&self) -> CatalogRepository {
        CatalogRepository::new(self.clone())
    }

    /// Returns the ledger repository.
    pub fn ledger(&self) -> LedgerRepository {
        LedgerRepository::new(self.clone())
    }

    /// Starts a serialized write transaction.
    ///
    /// Waits for any other writer to finish. Everything done through the
    /// returned [`WriteTx`] commits together or not at all.
    pub async fn begin_write(&self) -> DbResult<WriteTx> {
        WriteTx::begin(&self.pool, Arc::clone(&self.writer)).await
    }

    /// Closes the database connection pool.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.catalog().try_load().await.unwrap().is_empty());
        assert!(db.ledger().read_transactions().await.is_empty());
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/stockroom.db")
            .max_connections(10)
            .min_connections(2)
            .seed_if_created(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert!(!config.seed_if_created);
        assert!(DbConfig::in_memory().is_in_memory());
    }

    #[tokio::test]
    async fn test_new_file_is_seeded_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("stockroom.db");

        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        let products = db.catalog().try_load().await.unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].barcode, "6901234567890");
        assert!(db.ledger().read_stock_log().await.is_empty());
        assert!(db.ledger().read_transactions().await.is_empty());
        db.close().await;

        // Reopening an existing file never reseeds.
        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        assert_eq!(db.catalog().try_load().await.unwrap().len(), 2);
        db.close().await;
    }

    #[tokio::test]
    async fn test_seed_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.db");

        let db = Database::new(DbConfig::new(&path).seed_if_created(false))
            .await
            .unwrap();
        assert!(db.catalog().try_load().await.unwrap().is_empty());
        db.close().await;
    }
}
