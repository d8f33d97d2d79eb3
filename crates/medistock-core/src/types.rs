//! # Domain Types
//!
//! Core domain types used throughout MediStock.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Tenant ──owns──► Store ──owns──► Product ──lots──► Batch               │
//! │                     │                                                   │
//! │                     └──owns──► Sale ──owns──► SaleItem ┄┄weak┄┄► Batch  │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │     Batch       │   │      Sale       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  sku, barcode   │   │  batch_number   │   │  invoice_number │       │
//! │  │  price_cents    │   │  expiry_date    │   │  subtotal_cents │       │
//! │  │  stock_quantity │   │  remaining_qty  │   │  tax_cents      │       │
//! │  │  = Σ remaining  │   │  (never < 0)    │   │  total_cents    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (sku, batch_number, invoice_number) - human-readable

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 1200 bps = 12% GST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Tenancy
// =============================================================================

/// Role of the acting user within a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Manager,
    Cashier,
    /// Read-only access (reports, alerts).
    Viewer,
}

impl Role {
    /// Owners, managers and cashiers ring up sales.
    pub fn can_sell(&self) -> bool {
        matches!(self, Role::Owner | Role::Manager | Role::Cashier)
    }

    /// Only owners and managers edit the catalog or receive/retire batches.
    pub fn can_manage_inventory(&self) -> bool {
        matches!(self, Role::Owner | Role::Manager)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Owner => write!(f, "owner"),
            Role::Manager => write!(f, "manager"),
            Role::Cashier => write!(f, "cashier"),
            Role::Viewer => write!(f, "viewer"),
        }
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "owner" => Ok(Role::Owner),
            "manager" => Ok(Role::Manager),
            "cashier" => Ok(Role::Cashier),
            "viewer" => Ok(Role::Viewer),
            other => Err(ValidationError::InvalidFormat {
                field: "role".to_string(),
                reason: format!("unknown role '{}'", other),
            }),
        }
    }
}

/// The resolved identity of the caller, supplied by the identity layer.
///
/// Every service operation takes this explicitly; every query it issues is
/// filtered by `tenant_id` (and `store_id` where the table carries one).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TenantContext {
    pub user_id: String,
    pub tenant_id: String,
    pub store_id: String,
    pub role: Role,
}

impl TenantContext {
    pub fn new(
        user_id: impl Into<String>,
        tenant_id: impl Into<String>,
        store_id: impl Into<String>,
        role: Role,
    ) -> Self {
        TenantContext {
            user_id: user_id.into(),
            tenant_id: tenant_id.into(),
            store_id: store_id.into(),
            role,
        }
    }

    /// Fails with `Forbidden` unless the role may ring up sales.
    pub fn ensure_can_sell(&self) -> CoreResult<()> {
        self.ensure(self.role.can_sell(), "sell")
    }

    /// Fails with `Forbidden` unless the role may change catalog or batches.
    pub fn ensure_can_manage_inventory(&self) -> CoreResult<()> {
        self.ensure(self.role.can_manage_inventory(), "manage inventory")
    }

    fn ensure(&self, allowed: bool, action: &str) -> CoreResult<()> {
        if allowed {
            Ok(())
        } else {
            Err(CoreError::Forbidden {
                role: self.role.to_string(),
                action: action.to_string(),
            })
        }
    }
}

/// A business/account boundary.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A sales location under a tenant.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Store {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    /// Soft delete flag.
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    pub tenant_id: String,

    pub store_id: String,

    /// Stock Keeping Unit - business identifier, unique per store.
    pub sku: String,

    /// Barcode (EAN-13, UPC-A, etc.) used for scan lookup.
    pub barcode: Option<String>,

    /// Display name shown to cashier and on invoice.
    pub name: String,

    /// HSN classification code printed on tax invoices.
    pub hsn_code: Option<String>,

    /// Selling price in cents.
    pub price_cents: i64,

    /// Maximum retail price; the selling price may not exceed it.
    pub mrp_cents: Option<i64>,

    /// Tax rate in basis points (1200 = 12%).
    pub tax_rate_bps: u32,

    /// Aggregate stock; equals Σ remaining_quantity of active batches.
    pub stock_quantity: i64,

    /// Aggregate low-stock threshold.
    pub min_stock_level: i64,

    /// Per-batch low-stock threshold; `None` means the default of 5.
    pub min_batch_stock_level: Option<i64>,

    /// Soft delete flag.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub barcode: Option<String>,
    pub hsn_code: Option<String>,
    pub price_cents: i64,
    pub mrp_cents: Option<i64>,
    pub tax_rate_bps: u32,
    pub min_stock_level: i64,
    pub min_batch_stock_level: Option<i64>,
    /// Opening stock for products sold without batch tracking.
    /// Batch-tracked products start at zero and grow through receipts.
    pub opening_stock: i64,
}

/// Editable product fields. Stock is never edited here.
///
/// Nullable columns take a double option: `None` leaves the value alone,
/// `Some(None)` clears it, `Some(Some(v))` sets it. Over serde an absent
/// field is `None` and an explicit `null` is `Some(None)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub barcode: Option<String>,
    pub hsn_code: Option<String>,
    pub price_cents: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    pub mrp_cents: Option<Option<i64>>,
    pub tax_rate_bps: Option<u32>,
    pub min_stock_level: Option<i64>,
    /// Clearing falls back to the store-wide default threshold.
    #[serde(default, deserialize_with = "double_option")]
    pub min_batch_stock_level: Option<Option<i64>>,
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// =============================================================================
// Batch
// =============================================================================

/// A dated lot of a product.
///
/// ## Lifecycle
/// ```text
/// receive ──► active, remaining = quantity
///                │
///                ├── sale ──► remaining -= qty   (never below 0)
///                │
///                └── retire ──► is_active = false
///
/// Reaching remaining = 0 does NOT retire the batch.
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Batch {
    pub id: String,
    pub tenant_id: String,
    pub product_id: String,
    /// Unique per product within a tenant.
    pub batch_number: String,
    #[ts(as = "Option<String>")]
    pub manufacturing_date: Option<NaiveDate>,
    #[ts(as = "String")]
    pub expiry_date: NaiveDate,
    /// Cost basis per unit in cents.
    pub purchase_price_cents: i64,
    /// Original lot size, immutable.
    pub quantity: i64,
    pub remaining_quantity: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    /// A batch expiring today is already unsellable.
    #[inline]
    pub fn is_expired_on(&self, today: NaiveDate) -> bool {
        self.expiry_date <= today
    }

    /// Days from `today` until expiry (negative once past).
    #[inline]
    pub fn days_until_expiry(&self, today: NaiveDate) -> i64 {
        (self.expiry_date - today).num_days()
    }

    /// Active, in stock and not expired.
    pub fn is_sellable_on(&self, today: NaiveDate) -> bool {
        self.is_active && self.remaining_quantity > 0 && !self.is_expired_on(today)
    }
}

/// Input for receiving a batch into inventory.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewBatch {
    pub product_id: String,
    pub batch_number: String,
    #[ts(as = "Option<String>")]
    pub manufacturing_date: Option<NaiveDate>,
    #[ts(as = "String")]
    pub expiry_date: NaiveDate,
    pub purchase_price_cents: i64,
    pub quantity: i64,
}

/// Outcome of recomputing a product's stock from its active batches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockReconciliation {
    pub product_id: String,
    pub previous_stock: i64,
    pub reconciled_stock: i64,
}

impl StockReconciliation {
    pub fn drift(&self) -> i64 {
        self.reconciled_stock - self.previous_stock
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    /// Card payment on an external terminal.
    Card,
    /// UPI / QR wallet transfer.
    Upi,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "cash"),
            PaymentMethod::Card => write!(f, "card"),
            PaymentMethod::Upi => write!(f, "upi"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" | "credit" | "debit" => Ok(PaymentMethod::Card),
            "upi" | "qr" => Ok(PaymentMethod::Upi),
            other => Err(ValidationError::InvalidFormat {
                field: "payment_method".to_string(),
                reason: format!("unknown payment method '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// Optional customer details captured at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    pub name: Option<String>,
    pub phone: Option<String>,
}

/// An immutable sale record. Never amended after checkout.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub tenant_id: String,
    pub store_id: String,
    /// Unique within the tenant.
    pub invoice_number: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    /// User who rang up the sale.
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A line item in a sale.
/// Uses snapshot pattern to freeze product and batch data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    /// Weak reference; the snapshots below are authoritative for history.
    pub product_id: String,
    pub batch_id: Option<String>,
    pub sku_snapshot: String,
    pub name_snapshot: String,
    pub hsn_snapshot: Option<String>,
    pub batch_number_snapshot: Option<String>,
    #[ts(as = "Option<String>")]
    pub expiry_snapshot: Option<NaiveDate>,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub tax_rate_bps: u32,
    pub tax_cents: i64,
    /// unit_price × quantity, before tax.
    pub line_total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A persisted sale together with its lines, ready for receipt rendering.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CompletedSale {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn batch_expiring(expiry: NaiveDate, remaining: i64) -> Batch {
        let now = Utc::now();
        Batch {
            id: "b-1".to_string(),
            tenant_id: "t-1".to_string(),
            product_id: "p-1".to_string(),
            batch_number: "LOT-1".to_string(),
            manufacturing_date: None,
            expiry_date: expiry,
            purchase_price_cents: 100,
            quantity: 10,
            remaining_quantity: remaining,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_tax_rate_from_percentage() {
        let rate = TaxRate::from_percentage(12.0);
        assert_eq!(rate.bps(), 1200);
        assert!((rate.percentage() - 12.0).abs() < 0.001);
    }

    #[test]
    fn test_role_permissions() {
        assert!(Role::Cashier.can_sell());
        assert!(!Role::Cashier.can_manage_inventory());
        assert!(Role::Manager.can_manage_inventory());
        assert!(!Role::Viewer.can_sell());
        assert_eq!("Owner".parse::<Role>().unwrap(), Role::Owner);
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_context_guards() {
        let cashier = TenantContext::new("u-1", "t-1", "s-1", Role::Cashier);
        assert!(cashier.ensure_can_sell().is_ok());
        assert!(matches!(
            cashier.ensure_can_manage_inventory(),
            Err(CoreError::Forbidden { .. })
        ));

        let viewer = TenantContext::new("u-2", "t-1", "s-1", Role::Viewer);
        let err = viewer.ensure_can_sell().unwrap_err();
        assert_eq!(err.to_string(), "Role viewer is not allowed to sell");
    }

    #[test]
    fn test_batch_expiring_today_is_expired() {
        let today = date(2026, 3, 15);
        let batch = batch_expiring(today, 5);
        assert!(batch.is_expired_on(today));
        assert!(!batch.is_sellable_on(today));
        assert_eq!(batch.days_until_expiry(today), 0);
    }

    #[test]
    fn test_batch_sellable() {
        let today = date(2026, 3, 15);
        assert!(batch_expiring(date(2026, 3, 16), 1).is_sellable_on(today));
        assert!(!batch_expiring(date(2026, 3, 16), 0).is_sellable_on(today));
    }

    #[test]
    fn test_payment_method_parse() {
        assert_eq!("UPI".parse::<PaymentMethod>().unwrap(), PaymentMethod::Upi);
        assert_eq!("debit".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_product_update_null_clears() {
        let update: ProductUpdate =
            serde_json::from_str(r#"{"mrpCents": null, "minBatchStockLevel": 8}"#).unwrap();
        assert_eq!(update.mrp_cents, Some(None));
        assert_eq!(update.min_batch_stock_level, Some(Some(8)));

        let untouched: ProductUpdate = serde_json::from_str(r#"{"name": "ORS"}"#).unwrap();
        assert_eq!(untouched.mrp_cents, None);
        assert_eq!(untouched.min_batch_stock_level, None);
    }
}
