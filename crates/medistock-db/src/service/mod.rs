//! # Inventory Services
//!
//! Operations spanning several repositories.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  AllocationEngine       read-only batch choice for a cart line         │
//! │  SettlementCoordinator  atomic checkout: sale, items, decrements       │
//! │  AlertProjector         low-stock and expiry projections               │
//! │  ReportService          sales summary over a date range                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Services are cheap handles obtained from [`crate::Database`]; each call
//! takes the caller's [`medistock_core::TenantContext`] explicitly.

pub mod alerts;
pub mod allocation;
pub mod reports;
pub mod settlement;

use chrono::{NaiveDate, Utc};

/// Current UTC calendar date; expiry is compared against this.
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}
