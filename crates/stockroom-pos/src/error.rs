//! # Operation Errors
//!
//! The single error type every stockroom operation returns.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Stockroom                              │
//! │                                                                         │
//! │  ValidationError ──┐                                                    │
//! │  CoreError ────────┼──► PosError ──► ErrorReport { code, message }      │
//! │  DbError ──────────┘        │                │                          │
//! │                             │                ▼                          │
//! │                             │        presentation layer shows message   │
//! │                             ▼                                           │
//! │          PartialCheckout { failures: ["方便面: Product not found", ..] } │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Persistence details are logged, not shown; the report carries a generic
//! message for those.

use serde::Serialize;
use stockroom_core::{CoreError, ValidationError};
use stockroom_db::DbError;
use thiserror::Error;

/// Errors returned by stockroom operations.
#[derive(Debug, Error)]
pub enum PosError {
    /// No catalog entry carries the barcode. Nothing was changed.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Input rejected before anything was persisted.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Some checkout lines failed and no transaction was recorded. Under the
    /// best-effort policy the lines that succeeded stay applied.
    #[error("Checkout partially failed: {}", .failures.join("; "))]
    PartialCheckout { failures: Vec<String> },

    /// The store could not be read or written.
    #[error("Storage error: {0}")]
    Persistence(#[from] DbError),

    /// Configuration file or environment is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<CoreError> for PosError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(barcode) => PosError::ProductNotFound(barcode),
        }
    }
}

impl From<toml::de::Error> for PosError {
    fn from(err: toml::de::Error) -> Self {
        PosError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for PosError {
    fn from(err: toml::ser::Error) -> Self {
        PosError::Config(err.to_string())
    }
}

impl From<std::io::Error> for PosError {
    fn from(err: std::io::Error) -> Self {
        PosError::Config(err.to_string())
    }
}

/// Result type for stockroom operations.
pub type PosResult<T> = Result<T, PosError>;

// =============================================================================
// Error Reports
// =============================================================================

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Barcode not in the catalog
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Checkout completed for some lines only
    PartialCheckout,

    /// Store read/write failed
    DatabaseError,

    /// Bad configuration
    ConfigError,
}

/// What the presentation layer receives when an operation fails.
///
/// ```json
/// { "code": "NOT_FOUND", "message": "Product not found: 6901234567890" }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
    /// Per-line messages of a partial checkout.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl PosError {
    /// The error's category.
    pub fn code(&self) -> ErrorCode {
        match self {
            PosError::ProductNotFound(_) => ErrorCode::NotFound,
            PosError::Validation(_) => ErrorCode::ValidationError,
            PosError::PartialCheckout { .. } => ErrorCode::PartialCheckout,
            PosError::Persistence(_) => ErrorCode::DatabaseError,
            PosError::Config(_) => ErrorCode::ConfigError,
        }
    }

    /// Builds the user-facing report.
    pub fn report(&self) -> ErrorReport {
        let (message, details) = match self {
            PosError::PartialCheckout { failures } => (
                "Some items could not be checked out".to_string(),
                failures.clone(),
            ),
            PosError::Persistence(e) => {
                tracing::error!(error = %e, "Store operation failed");
                let message = if e.is_connection() {
                    "Database connection failed"
                } else {
                    "Database operation failed"
                };
                (message.to_string(), Vec::new())
            }
            other => (other.to_string(), Vec::new()),
        };

        ErrorReport {
            code: self.code(),
            message,
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(
            PosError::ProductNotFound("1".into()).code(),
            ErrorCode::NotFound
        );
        assert_eq!(
            PosError::from(DbError::WriteFailed("disk full".into())).code(),
            ErrorCode::DatabaseError
        );
        let core: PosError = CoreError::ProductNotFound("9".into()).into();
        assert!(matches!(core, PosError::ProductNotFound(ref b) if b == "9"));
    }

    #[test]
    fn test_partial_checkout_message() {
        let err = PosError::PartialCheckout {
            failures: vec![
                "方便面: Product not found: 6909876543210".to_string(),
                "Cola: Product not found: 123".to_string(),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Checkout partially failed: 方便面: Product not found: 6909876543210; \
             Cola: Product not found: 123"
        );

        let report = err.report();
        assert_eq!(report.code, ErrorCode::PartialCheckout);
        assert_eq!(report.details.len(), 2);
    }

    #[test]
    fn test_report_serialization_hides_storage_details() {
        let err = PosError::from(DbError::WriteFailed("SQLITE_FULL".into()));
        let json = serde_json::to_value(err.report()).unwrap();
        assert_eq!(json["code"], "DATABASE_ERROR");
        assert_eq!(json["message"], "Database operation failed");
        assert!(json.get("details").is_none());
    }
}
