//! # medistock-core: Pure Business Logic for MediStock
//!
//! This crate is the **heart** of MediStock. It contains the batch allocation
//! policy, cart and sale arithmetic, and alert rules as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        MediStock Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    UI / Report layer (external)                 │   │
//! │  │    Scan ──► Pick batch ──► Cart ──► Checkout ──► Receipt        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             medistock-db (services + repositories)              │   │
//! │  │   AllocationEngine, SettlementCoordinator, AlertProjector       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ medistock-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │  types   │ │allocation│ │   cart   │ │  alerts  │          │   │
//! │  │   │ Product  │ │  FIFO by │ │ CartLine │ │  expiry  │          │   │
//! │  │   │  Batch   │ │  expiry  │ │  totals  │ │ low stock│          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK READS • PURE FUNCTIONS        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Batch, Sale, TenantContext, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`allocation`] - FIFO-by-expiry batch selection
//! - [`cart`] - Cart lines bound to batches
//! - [`settlement`] - Sale totals computed from a cart
//! - [`alerts`] - Expiry and low-stock classification
//! - [`invoice`] - Monotonic invoice number sequence
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use medistock_core::money::Money;
//! use medistock_core::types::TaxRate;
//!
//! let price = Money::from_cents(1099); // 10.99
//! let tax_rate = TaxRate::from_bps(1200); // 12% GST
//! let tax = price.calculate_tax(tax_rate);
//!
//! // 10.99 × 12% = 1.3188 → 1.32
//! assert_eq!(tax.cents(), 132);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod alerts;
pub mod allocation;
pub mod cart;
pub mod error;
pub mod invoice;
pub mod money;
pub mod settlement;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single cart line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., scanning 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Ceiling of a unit price or MRP in minor units (10,000,000.00).
///
/// A full cart at this price and the maximum tax rate stays far inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000;

/// Per-batch low-stock threshold used when a product leaves
/// `min_batch_stock_level` unset.
pub const DEFAULT_MIN_BATCH_STOCK_LEVEL: i64 = 5;

/// Batches expiring within this many days are flagged as expiring soon.
pub const DEFAULT_EXPIRY_WARNING_DAYS: i64 = 30;

/// Prefix of generated invoice numbers (`INV-<millis>`).
pub const DEFAULT_INVOICE_PREFIX: &str = "INV";
