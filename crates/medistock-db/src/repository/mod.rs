//! # Repository Module
//!
//! Database repository implementations for MediStock.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories                                         │
//! │                                                                         │
//! │  Service / caller                                                      │
//! │       │  db.products().find_by_barcode(&ctx, "8901234567890")          │
//! │       ▼                                                                 │
//! │  TenantRepository   - tenants, stores                                  │
//! │  ProductRepository  - catalog store                                    │
//! │  BatchRepository    - batch ledger (receipt, retirement, reconcile)    │
//! │  SaleRepository     - sale history                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (every query filtered by ctx.tenant_id / ctx.store_id)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Statements that must share a transaction with other tables are exposed as
//! associated functions taking `&mut SqliteConnection`; callers pass
//! `&mut *tx`.

pub mod batch;
pub mod product;
pub mod sale;
pub mod tenant;

use uuid::Uuid;

/// Generates a new UUID v4 primary key.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
