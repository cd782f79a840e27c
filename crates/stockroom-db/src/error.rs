//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← read vs write vs connection                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PosError::Persistence (stockroom-pos) ← error code + message          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Presentation shows the message                                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Reading a table failed.
    ///
    /// ## When This Occurs
    /// - Table missing or unreadable
    /// - Cell cannot be decoded
    #[error("Read failed: {0}")]
    ReadFailed(String),

    /// Writing to a table failed. The enclosing transaction is rolled back.
    ///
    /// ## When This Occurs
    /// - Disk full, read-only file
    /// - Constraint violation (duplicate ledger id)
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be created
    /// - File permissions issue
    /// - Pool timed out or closed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored JSON payload could not be encoded or decoded.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Classifies an error raised while reading.
    pub fn read(err: sqlx::Error) -> Self {
        match DbError::from(err) {
            DbError::Internal(msg) => DbError::ReadFailed(msg),
            other => other,
        }
    }

    /// Classifies an error raised while writing.
    pub fn write(err: sqlx::Error) -> Self {
        match DbError::from(err) {
            DbError::Internal(msg) | DbError::ReadFailed(msg) => DbError::WriteFailed(msg),
            other => other,
        }
    }

    /// Whether the failure is about reaching the database at all.
    pub fn is_connection(&self) -> bool {
        matches!(self, DbError::ConnectionFailed(_))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::PoolTimedOut / PoolClosed / Io / Configuration → ConnectionFailed
/// sqlx::Error::ColumnDecode / Decode / ColumnNotFound         → ReadFailed
/// Other                                                       → Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => {
                DbError::ConnectionFailed("Connection pool exhausted".to_string())
            }
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),
            sqlx::Error::Io(e) => DbError::ConnectionFailed(e.to_string()),
            sqlx::Error::Configuration(e) => DbError::ConnectionFailed(e.to_string()),

            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_)
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::RowNotFound => DbError::ReadFailed(err.to_string()),

            sqlx::Error::Database(db_err) => DbError::Internal(db_err.message().to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_connection_failures() {
        assert!(DbError::from(sqlx::Error::PoolTimedOut).is_connection());
        assert!(DbError::write(sqlx::Error::PoolClosed).is_connection());
    }

    #[test]
    fn test_read_and_write_classification() {
        assert!(matches!(
            DbError::read(sqlx::Error::Protocol("bad frame".to_string())),
            DbError::ReadFailed(_)
        ));
        assert!(matches!(
            DbError::write(sqlx::Error::RowNotFound),
            DbError::WriteFailed(_)
        ));
    }
}
