//! # Allocation Engine
//!
//! Chooses which batch a cart line draws from. Reads only; nothing is
//! reserved, settlement re-checks every batch.
//!
//! ## Flow
//! ```text
//! allocate(ctx, product, qty, mode, batch_id)
//!      │
//!      ├── role may sell? product active in store?
//!      ├── BatchRepository::candidates  (active, remaining > 0, FIFO order)
//!      ├── AllocationPolicy::eligible    (drop expiry <= today)
//!      └── AllocationPolicy::select      (Auto: first / Manual: chosen)
//! ```

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::debug;

use medistock_core::allocation::{AllocationMode, AllocationPolicy, BatchAllocation, SplitAllocation};
use medistock_core::validation::validate_quantity;
use medistock_core::{Batch, Product, TenantContext};

use crate::config::InventorySettings;
use crate::error::InventoryResult;
use crate::repository::batch::BatchRepository;
use crate::repository::product::ProductRepository;
use crate::service::today;

#[derive(Debug, Clone)]
pub struct AllocationEngine {
    pool: SqlitePool,
    settings: Arc<InventorySettings>,
}

impl AllocationEngine {
    pub fn new(pool: SqlitePool, settings: Arc<InventorySettings>) -> Self {
        AllocationEngine { pool, settings }
    }

    /// Sellable batches of a product, soonest expiry first.
    ///
    /// Used by manual mode to show the cashier a choice.
    pub async fn list_eligible_batches(
        &self,
        ctx: &TenantContext,
        product_id: &str,
    ) -> InventoryResult<Vec<BatchAllocation>> {
        let (_, policy, eligible) = self.load(ctx, product_id).await?;
        Ok(eligible.iter().map(|b| policy.describe(b)).collect())
    }

    /// Allocates `quantity` units of a product to a single batch.
    ///
    /// ## Returns
    /// * `Err(NoEligibleBatches)` - nothing sellable
    /// * `Err(InsufficientBatchStock)` - chosen batch holds too few units
    /// * `Err(BatchNotEligible)` - manual batch not in the eligible list
    pub async fn allocate(
        &self,
        ctx: &TenantContext,
        product_id: &str,
        quantity: i64,
        mode: AllocationMode,
        batch_id: Option<&str>,
    ) -> InventoryResult<BatchAllocation> {
        validate_quantity(quantity)?;

        let (product, policy, eligible) = self.load(ctx, product_id).await?;
        let allocation = policy.select(&product.id, &eligible, quantity, mode, batch_id)?;

        debug!(
            product_id = %product.id,
            batch_id = %allocation.batch_id,
            quantity,
            ?mode,
            "Batch allocated"
        );
        Ok(allocation)
    }

    /// Covers `quantity` across batches in FIFO order, one leg per batch.
    pub async fn plan_fifo_split(
        &self,
        ctx: &TenantContext,
        product_id: &str,
        quantity: i64,
    ) -> InventoryResult<Vec<SplitAllocation>> {
        let (product, policy, eligible) = self.load(ctx, product_id).await?;
        let legs = policy.plan_fifo_split(&product.id, &product.sku, &eligible, quantity)?;

        debug!(product_id = %product.id, quantity, legs = legs.len(), "FIFO split planned");
        Ok(legs)
    }

    async fn load(
        &self,
        ctx: &TenantContext,
        product_id: &str,
    ) -> InventoryResult<(Product, AllocationPolicy, Vec<Batch>)> {
        ctx.ensure_can_sell()?;

        let product = ProductRepository::new(self.pool.clone())
            .require_active(ctx, product_id)
            .await?;
        let candidates = BatchRepository::new(self.pool.clone())
            .candidates(&ctx.tenant_id, &product.id)
            .await?;

        let policy = AllocationPolicy::new(today(), self.settings.expiry_warning_days);
        let eligible = policy.eligible(candidates);
        Ok((product, policy, eligible))
    }
}
