//! # medistock-db: Persistence and Inventory Services for MediStock
//!
//! SQLite storage (via sqlx) for the pharmacy inventory, and the services
//! that mutate it: batch allocation, sale settlement, alerts and reports.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        MediStock Data Flow                              │
//! │                                                                         │
//! │  UI / terminal (supplies TenantContext)                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    medistock-db (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌────────────────┐  │   │
//! │  │   │   Database    │   │    Services    │   │  Repositories  │  │   │
//! │  │   │   (pool.rs)   │──►│ allocation     │──►│ tenant         │  │   │
//! │  │   │               │   │ settlement     │   │ product        │  │   │
//! │  │   │ SqlitePool    │   │ alerts         │   │ batch          │  │   │
//! │  │   │ settings      │   │ reports        │   │ sale           │  │   │
//! │  │   └───────────────┘   └────────────────┘   └────────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL) - medistock.db in the platform data directory            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - TOML configuration and environment overrides
//! - [`pool`] - Connection pool and the [`Database`] handle
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - [`DbError`] and the service-level [`InventoryError`]
//! - [`repository`] - Tenant, product, batch and sale repositories
//! - [`service`] - Allocation, settlement, alerts, reports
//!
//! ## Usage
//!
//! ```rust,ignore
//! use medistock_core::{allocation::AllocationMode, cart::Cart, CustomerInfo, PaymentMethod};
//! use medistock_db::{Database, MediStockConfig};
//!
//! let config = MediStockConfig::load(None)?;
//! let db = Database::open(&config).await?;
//!
//! let product = db.products().require_active(&ctx, &product_id).await?;
//! let allocation = db.allocation().allocate(&ctx, &product_id, 2, AllocationMode::Auto, None).await?;
//!
//! let mut cart = Cart::new();
//! cart.add_allocated(&product, &allocation, 2)?;
//! let sale = db.settlement()
//!     .complete_sale(&ctx, &cart, CustomerInfo::default(), PaymentMethod::Cash)
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

#[cfg(test)]
pub(crate) mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, DatabaseSettings, InventorySettings, MediStockConfig};
pub use error::{DbError, DbResult, InventoryError, InventoryResult};
pub use pool::{Database, DbConfig};

pub use repository::batch::BatchRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
pub use repository::tenant::TenantRepository;

pub use service::alerts::AlertProjector;
pub use service::allocation::AllocationEngine;
pub use service::reports::ReportService;
pub use service::settlement::SettlementCoordinator;
