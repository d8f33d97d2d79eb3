//! # Error Types
//!
//! Domain-specific error types for medistock-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  medistock-core errors (this file)                                     │
//! │  ├── CoreError        - Allocation / settlement rule violations        │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  medistock-db errors (separate crate)                                  │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── InventoryError   - CoreError | DbError, returned by services      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → InventoryError → caller (UI)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, batch number, quantities)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These represent rule violations in allocation and settlement. The cart
/// that triggered them is never modified, so the caller can correct it.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found in the caller's tenant/store.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Batch cannot be found, is retired, or belongs to another product.
    #[error("Batch not found: {0}")]
    BatchNotFound(String),

    /// Store is missing, inactive, or not part of the caller's tenant.
    #[error("Store not found: {0}")]
    StoreNotFound(String),

    /// Sale cannot be found in the caller's tenant.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// No active, non-expired, in-stock batch exists for the product.
    ///
    /// ## User Workflow
    /// ```text
    /// Scan product
    ///      │
    ///      ▼
    /// All batches expired or empty
    ///      │
    ///      ▼
    /// NoEligibleBatches { product_id }
    ///      │
    ///      ▼
    /// UI shows: "No sellable stock"; cart unchanged
    /// ```
    #[error("No eligible batches for product {product_id}")]
    NoEligibleBatches { product_id: String },

    /// The batch picked for the request holds less than requested.
    ///
    /// Batches are never split automatically; the caller requests a
    /// smaller quantity or adds the rest from the next batch.
    #[error("Batch {batch_number} has {available} available, requested {requested}")]
    InsufficientBatchStock {
        batch_number: String,
        available: i64,
        requested: i64,
    },

    /// A manually picked batch is not in the eligible list.
    #[error("Batch {batch_id} is not eligible for sale")]
    BatchNotEligible { batch_id: String },

    /// The conditional batch decrement affected zero rows at checkout.
    ///
    /// ## When This Occurs
    /// Two terminals allocated the same last units; the first checkout
    /// won and this one must be corrected (remove or re-allocate the line).
    #[error("Batch {batch_number} oversold: available {available}, requested {requested}")]
    BatchOversold {
        batch_id: String,
        batch_number: String,
        available: i64,
        requested: i64,
    },

    /// The batch expired between allocation and checkout.
    #[error("Batch {batch_number} expired on {expiry_date}")]
    BatchExpired {
        batch_number: String,
        expiry_date: chrono::NaiveDate,
    },

    /// Insufficient aggregate product stock to complete the sale.
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Checkout attempted with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// The actor's role does not permit the operation.
    #[error("Role {role} is not allowed to {action}")]
    Forbidden { role: String, action: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Reported before any I/O runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date order).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not allowed in this combination of inputs.
    #[error("{field} is not allowed: {reason}")]
    NotAllowed { field: String, reason: String },

    /// Duplicate value (e.g., duplicate SKU or batch number).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Shorthand for [`ValidationError::Duplicate`].
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        ValidationError::Duplicate {
            field: field.into(),
            value: value.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::BatchOversold {
            batch_id: "b-1".to_string(),
            batch_number: "LOT-42".to_string(),
            available: 4,
            requested: 6,
        };
        assert_eq!(
            err.to_string(),
            "Batch LOT-42 oversold: available 4, requested 6"
        );

        let err = CoreError::NoEligibleBatches {
            product_id: "p-1".to_string(),
        };
        assert_eq!(err.to_string(), "No eligible batches for product p-1");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::required("batch_id");
        assert_eq!(err.to_string(), "batch_id is required");

        let err = ValidationError::duplicate("sku", "PARA-500");
        assert_eq!(err.to_string(), "sku 'PARA-500' already exists");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("sku").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
