//! # Validation Module
//!
//! Input validation utilities for MediStock.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Service entry (medistock-db services)                        │
//! │  ├── Role check (TenantContext)                                        │
//! │  └── THIS MODULE: Business rule validation, before any I/O             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Conditional writes                                           │
//! │  └── remaining_quantity >= qty, stock_quantity >= qty                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (remaining_quantity BETWEEN 0 AND quantity)                 │
//! │  ├── UNIQUE (tenant_id, invoice_number)                                │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use medistock_core::validation::{validate_sku, validate_quantity};
//!
//! validate_sku("PARA-500").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::types::{CustomerInfo, NewBatch, NewProduct, ProductUpdate};
use crate::{MAX_ITEM_QUANTITY, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use medistock_core::validation::validate_sku;
///
/// assert!(validate_sku("PARA-500").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    validate_code("sku", sku, 50)
}

/// Validates a batch (lot) number. Same character rules as a SKU.
pub fn validate_batch_number(batch_number: &str) -> ValidationResult<()> {
    validate_code("batch_number", batch_number, 50)
}

fn validate_code(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.len() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    if !value
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_display_name("name", name, 200)
}

/// Validates a free-text display name (tenant, store, product).
pub fn validate_display_name(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates an optional HSN code: 2 to 8 digits when present.
pub fn validate_hsn_code(hsn: Option<&str>) -> ValidationResult<()> {
    let Some(hsn) = hsn.map(str::trim).filter(|h| !h.is_empty()) else {
        return Ok(());
    };

    if hsn.len() < 2 || hsn.len() > 8 || !hsn.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "hsn_code".to_string(),
            reason: "must be 2 to 8 digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a search query.
///
/// ## Returns
/// The trimmed query string (may be empty).
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

/// Validates customer details captured at checkout.
pub fn validate_customer(customer: &CustomerInfo) -> ValidationResult<()> {
    if let Some(name) = &customer.name {
        if name.chars().count() > 100 {
            return Err(ValidationError::TooLong {
                field: "customer_name".to_string(),
                max: 100,
            });
        }
    }

    if let Some(phone) = customer.phone.as_deref().map(str::trim) {
        if phone.len() > 20
            || !phone
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' '))
        {
            return Err(ValidationError::InvalidFormat {
                field: "customer_phone".to_string(),
                reason: "must be at most 20 digits, spaces, '+' or '-'".to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ```text
/// validate_quantity(qty)
///      │
///      ├── qty <= 0?   → MustBePositive
///      ├── qty > 999?  → OutOfRange
///      └── OK → allocate / add to cart
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a selling price in cents: 0..=MAX_PRICE_CENTS.
///
/// ```rust
/// use medistock_core::validation::validate_price_cents;
/// use medistock_core::MAX_PRICE_CENTS;
///
/// assert!(validate_price_cents(1099).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// assert!(validate_price_cents(MAX_PRICE_CENTS + 1).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    validate_amount("price", cents)
}

fn validate_amount(field: &str, cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Selling price may not exceed the MRP when one is set.
pub fn validate_mrp(price_cents: i64, mrp_cents: Option<i64>) -> ValidationResult<()> {
    let Some(mrp) = mrp_cents else {
        return Ok(());
    };

    validate_amount("mrp", mrp)?;

    if price_cents > mrp {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: mrp,
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

/// Validates a value that may be zero but never negative
/// (stock thresholds, purchase prices, opening stock).
pub fn validate_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Date Validators
// =============================================================================

/// Manufacturing date, when known, must not be after the expiry date.
pub fn validate_batch_dates(
    manufacturing_date: Option<NaiveDate>,
    expiry_date: NaiveDate,
) -> ValidationResult<()> {
    match manufacturing_date {
        Some(mfg) if mfg > expiry_date => Err(ValidationError::InvalidFormat {
            field: "manufacturing_date".to_string(),
            reason: format!("{} is after expiry date {}", mfg, expiry_date),
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates every field of a new product.
pub fn validate_new_product(input: &NewProduct) -> ValidationResult<()> {
    validate_sku(&input.sku)?;
    validate_product_name(&input.name)?;
    validate_hsn_code(input.hsn_code.as_deref())?;
    validate_price_cents(input.price_cents)?;
    validate_mrp(input.price_cents, input.mrp_cents)?;
    validate_tax_rate_bps(input.tax_rate_bps)?;
    validate_non_negative("min_stock_level", input.min_stock_level)?;
    if let Some(level) = input.min_batch_stock_level {
        validate_non_negative("min_batch_stock_level", level)?;
    }
    validate_non_negative("opening_stock", input.opening_stock)?;
    Ok(())
}

/// Validates the fields present in a product update.
///
/// The MRP ceiling is checked against the merged record by the caller,
/// since either side may be absent from the update.
pub fn validate_product_update(update: &ProductUpdate) -> ValidationResult<()> {
    if let Some(name) = &update.name {
        validate_product_name(name)?;
    }
    validate_hsn_code(update.hsn_code.as_deref())?;
    if let Some(price) = update.price_cents {
        validate_price_cents(price)?;
    }
    if let Some(bps) = update.tax_rate_bps {
        validate_tax_rate_bps(bps)?;
    }
    if let Some(level) = update.min_stock_level {
        validate_non_negative("min_stock_level", level)?;
    }
    if let Some(Some(level)) = update.min_batch_stock_level {
        validate_non_negative("min_batch_stock_level", level)?;
    }
    Ok(())
}

/// Validates a batch receipt.
pub fn validate_new_batch(input: &NewBatch) -> ValidationResult<()> {
    if input.product_id.trim().is_empty() {
        return Err(ValidationError::required("product_id"));
    }
    validate_batch_number(&input.batch_number)?;
    if input.quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    validate_non_negative("purchase_price", input.purchase_price_cents)?;
    validate_batch_dates(input.manufacturing_date, input.expiry_date)?;
    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string.
///
/// ```rust
/// use medistock_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required("id"));
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_product() -> NewProduct {
        NewProduct {
            sku: "PARA-500".to_string(),
            name: "Paracetamol 500mg".to_string(),
            hsn_code: Some("3004".to_string()),
            price_cents: 3310,
            mrp_cents: Some(3500),
            tax_rate_bps: 1200,
            min_stock_level: 10,
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("PARA-500").is_ok());
        assert!(validate_sku("ABC123").is_ok());
        assert!(validate_sku("product_1").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_mrp_ceiling() {
        assert!(validate_mrp(3310, Some(3500)).is_ok());
        assert!(validate_mrp(3500, Some(3500)).is_ok());
        assert!(validate_mrp(3310, None).is_ok());
        assert!(matches!(
            validate_mrp(3600, Some(3500)),
            Err(ValidationError::OutOfRange { max: 3500, .. })
        ));
    }

    #[test]
    fn test_validate_hsn_code() {
        assert!(validate_hsn_code(None).is_ok());
        assert!(validate_hsn_code(Some("")).is_ok());
        assert!(validate_hsn_code(Some("30049099")).is_ok());
        assert!(validate_hsn_code(Some("3")).is_err());
        assert!(validate_hsn_code(Some("30A4")).is_err());
    }

    #[test]
    fn test_validate_batch_dates() {
        let expiry = date(2027, 1, 31);
        assert!(validate_batch_dates(None, expiry).is_ok());
        assert!(validate_batch_dates(Some(date(2025, 1, 31)), expiry).is_ok());
        assert!(validate_batch_dates(Some(expiry), expiry).is_ok());
        assert!(validate_batch_dates(Some(date(2027, 2, 1)), expiry).is_err());
    }

    #[test]
    fn test_validate_new_product() {
        assert!(validate_new_product(&sample_product()).is_ok());

        let mut bad = sample_product();
        bad.tax_rate_bps = 10001;
        assert!(validate_new_product(&bad).is_err());

        let mut bad = sample_product();
        bad.min_batch_stock_level = Some(-1);
        assert!(validate_new_product(&bad).is_err());
    }

    #[test]
    fn test_validate_new_batch() {
        let batch = NewBatch {
            product_id: "p-1".to_string(),
            batch_number: "LOT-2026-01".to_string(),
            manufacturing_date: Some(date(2026, 1, 1)),
            expiry_date: date(2028, 1, 1),
            purchase_price_cents: 2000,
            quantity: 100,
        };
        assert!(validate_new_batch(&batch).is_ok());

        let zero_qty = NewBatch {
            quantity: 0,
            ..batch.clone()
        };
        assert!(matches!(
            validate_new_batch(&zero_qty),
            Err(ValidationError::MustBePositive { .. })
        ));

        let no_number = NewBatch {
            batch_number: " ".to_string(),
            ..batch
        };
        assert!(validate_new_batch(&no_number).is_err());
    }

    #[test]
    fn test_validate_customer() {
        let ok = CustomerInfo {
            name: Some("Asha".to_string()),
            phone: Some("+91 98450-12345".to_string()),
        };
        assert!(validate_customer(&ok).is_ok());
        assert!(validate_customer(&CustomerInfo::default()).is_ok());

        let bad = CustomerInfo {
            name: None,
            phone: Some("call me".to_string()),
        };
        assert!(validate_customer(&bad).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }
}
