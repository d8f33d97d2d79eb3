//! # Database Error Types
//!
//! Error types for database operations and the inventory services.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError ← constraint / busy / pool categorization                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  InventoryError = Domain(CoreError) | Persistence(DbError)             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Caller: is_retryable()? retry : show message, keep cart               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use medistock_core::{CoreError, ValidationError};
use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate batch number for a product
    /// - Any UNIQUE index violation other than invoice numbers
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Invoice number already taken within the tenant.
    ///
    /// Settlement draws a fresh number and retries; callers only see this
    /// once the retry budget is spent.
    #[error("Duplicate invoice number: {0}")]
    DuplicateInvoiceNumber(String),

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (e.g. remaining_quantity < 0).
    #[error("Constraint violation: {message}")]
    CheckViolation { message: String },

    /// Database is locked by another writer beyond the busy timeout.
    #[error("Database busy: {0}")]
    Busy(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Transient failures where retrying the whole operation may succeed.
    /// Nothing was committed when one of these is returned.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DbError::Busy(_)
                | DbError::PoolExhausted
                | DbError::ConnectionFailed(_)
                | DbError::DuplicateInvoiceNumber(_)
        )
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
///   UNIQUE ... invoice_number → DbError::DuplicateInvoiceNumber
///   database is locked        → DbError::Busy
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>, ..."
                // FK constraint: "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    if field.contains("invoice_number") {
                        DbError::DuplicateInvoiceNumber(field)
                    } else {
                        DbError::UniqueViolation {
                            field,
                            value: "unknown".to_string(),
                        }
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("database is locked") || msg.contains("database table is locked")
                {
                    DbError::Busy(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            sqlx::Error::Io(io) => DbError::ConnectionFailed(io.to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Inventory Error
// =============================================================================

/// Error returned by every inventory operation.
///
/// `Domain` errors mean the request itself is wrong (bad input, not enough
/// stock, oversold); correct the cart and resubmit. `Persistence` errors mean
/// the store could not complete the work; see [`InventoryError::is_retryable`].
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error(transparent)]
    Domain(#[from] CoreError),

    #[error(transparent)]
    Persistence(#[from] DbError),
}

impl InventoryError {
    pub fn is_retryable(&self) -> bool {
        match self {
            InventoryError::Domain(_) => false,
            InventoryError::Persistence(err) => err.is_retryable(),
        }
    }

    /// The domain error, if this is one.
    pub fn as_domain(&self) -> Option<&CoreError> {
        match self {
            InventoryError::Domain(err) => Some(err),
            InventoryError::Persistence(_) => None,
        }
    }
}

impl From<ValidationError> for InventoryError {
    fn from(err: ValidationError) -> Self {
        InventoryError::Domain(CoreError::Validation(err))
    }
}

impl From<sqlx::Error> for InventoryError {
    fn from(err: sqlx::Error) -> Self {
        InventoryError::Persistence(DbError::from(err))
    }
}

/// Result type for inventory operations.
pub type InventoryResult<T> = Result<T, InventoryError>;
