//! # Batch Repository
//!
//! The batch ledger: receipts, retirements, listings and the conditional
//! decrement settlement relies on.
//!
//! ## Conditional Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UPDATE batches SET remaining_quantity = remaining_quantity - :qty      │
//! │  WHERE id = :batch AND tenant_id = :tenant AND product_id = :product    │
//! │    AND is_active = 1 AND expiry_date > :today                           │
//! │    AND remaining_quantity >= :qty                                       │
//! │                                                                         │
//! │  1 row  → decremented, snapshot returned                               │
//! │  0 rows → re-read the batch to say why:                                │
//! │            missing / retired   → BatchNotFound                         │
//! │            expiry <= today     → BatchExpired                          │
//! │            otherwise           → BatchOversold { available }           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Check and write are one statement, so two terminals racing for the last
//! units cannot both succeed.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use medistock_core::validation::validate_new_batch;
use medistock_core::{
    Batch, CoreError, NewBatch, StockReconciliation, TenantContext, ValidationError,
};

use crate::error::{DbError, InventoryResult};
use crate::repository::generate_id;
use crate::repository::product::ProductRepository;

const BATCH_COLUMNS: &str = r#"
    id, tenant_id, product_id, batch_number, manufacturing_date, expiry_date,
    purchase_price_cents, quantity, remaining_quantity, is_active,
    created_at, updated_at
"#;

/// Batch number and expiry of a decremented batch, for the sale item snapshot.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub(crate) struct BatchSnapshot {
    pub batch_number: String,
    pub expiry_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
}

impl BatchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BatchRepository { pool }
    }

    // =========================================================================
    // Receipt / Retirement
    // =========================================================================

    /// Receives a batch and adds its quantity to product stock, atomically.
    ///
    /// ## Returns
    /// * `Err(Validation(Duplicate))` - batch number already used for the product
    /// * `Err(Validation(NotAllowed))` - product carries unbatched opening stock
    pub async fn receive(&self, ctx: &TenantContext, input: NewBatch) -> InventoryResult<Batch> {
        ctx.ensure_can_manage_inventory()?;
        validate_new_batch(&input)?;

        let now = Utc::now();
        let batch = Batch {
            id: generate_id(),
            tenant_id: ctx.tenant_id.clone(),
            product_id: input.product_id.clone(),
            batch_number: input.batch_number.trim().to_string(),
            manufacturing_date: input.manufacturing_date,
            expiry_date: input.expiry_date,
            purchase_price_cents: input.purchase_price_cents,
            quantity: input.quantity,
            remaining_quantity: input.quantity,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool.begin().await?;

        let product = match ProductRepository::fetch(&mut tx, ctx, &input.product_id).await? {
            Some(p) if p.is_active => p,
            _ => return Err(CoreError::ProductNotFound(input.product_id).into()),
        };

        // Stock that never came from a batch would break stock == Σ remaining
        if product.stock_quantity > 0 && !Self::has_history(&mut tx, &product.tenant_id, &product.id).await? {
            return Err(ValidationError::NotAllowed {
                field: "product_id".to_string(),
                reason: format!(
                    "{} holds {} units of unbatched stock; sell them or reconcile first",
                    product.sku, product.stock_quantity
                ),
            }
            .into());
        }

        let sql = format!(
            "INSERT INTO batches ({BATCH_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1, ?10, ?11)"
        );
        sqlx::query(&sql)
            .bind(&batch.id)
            .bind(&batch.tenant_id)
            .bind(&batch.product_id)
            .bind(&batch.batch_number)
            .bind(batch.manufacturing_date)
            .bind(batch.expiry_date)
            .bind(batch.purchase_price_cents)
            .bind(batch.quantity)
            .bind(batch.remaining_quantity)
            .bind(batch.created_at)
            .bind(batch.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { .. } => {
                    ValidationError::duplicate("batch_number", batch.batch_number.clone()).into()
                }
                other => crate::error::InventoryError::from(other),
            })?;

        ProductRepository::adjust_stock(&mut tx, &product, batch.quantity, now).await?;

        tx.commit().await?;

        info!(
            batch_id = %batch.id,
            product_id = %batch.product_id,
            batch_number = %batch.batch_number,
            quantity = batch.quantity,
            "Batch received"
        );
        Ok(batch)
    }

    /// Retires a batch and removes its remaining units from product stock.
    ///
    /// ## Returns
    /// * `Err(BatchNotFound)` - unknown, foreign or already retired batch
    pub async fn retire(&self, ctx: &TenantContext, batch_id: &str) -> InventoryResult<Batch> {
        ctx.ensure_can_manage_inventory()?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE batches SET is_active = 0, updated_at = ?1
            WHERE id = ?2 AND tenant_id = ?3 AND is_active = 1
              AND product_id IN (SELECT id FROM products WHERE tenant_id = ?3 AND store_id = ?4)
            RETURNING {BATCH_COLUMNS}
            "#
        );
        let batch = sqlx::query_as::<_, Batch>(&sql)
            .bind(now)
            .bind(batch_id)
            .bind(&ctx.tenant_id)
            .bind(&ctx.store_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CoreError::BatchNotFound(batch_id.to_string()))?;

        if batch.remaining_quantity > 0 {
            let product = ProductRepository::fetch(&mut tx, ctx, &batch.product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(batch.product_id.clone()))?;
            ProductRepository::adjust_stock(&mut tx, &product, -batch.remaining_quantity, now).await?;
        }

        tx.commit().await?;

        info!(
            batch_id = %batch.id,
            product_id = %batch.product_id,
            remaining = batch.remaining_quantity,
            "Batch retired"
        );
        Ok(batch)
    }

    /// Recomputes product stock from the active batch sum.
    pub async fn reconcile_stock(
        &self,
        ctx: &TenantContext,
        product_id: &str,
    ) -> InventoryResult<StockReconciliation> {
        ctx.ensure_can_manage_inventory()?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Write first so the transaction holds the write lock before reading
        let touched = sqlx::query(
            "UPDATE products SET updated_at = ?1 WHERE id = ?2 AND tenant_id = ?3 AND store_id = ?4",
        )
        .bind(now)
        .bind(product_id)
        .bind(&ctx.tenant_id)
        .bind(&ctx.store_id)
        .execute(&mut *tx)
        .await?;
        if touched.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(product_id.to_string()).into());
        }

        let previous_stock: i64 =
            sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?1")
                .bind(product_id)
                .fetch_one(&mut *tx)
                .await?;

        let reconciled_stock: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(remaining_quantity), 0)
            FROM batches
            WHERE product_id = ?1 AND tenant_id = ?2 AND is_active = 1
            "#,
        )
        .bind(product_id)
        .bind(&ctx.tenant_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE products SET stock_quantity = ?1 WHERE id = ?2")
            .bind(reconciled_stock)
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let result = StockReconciliation {
            product_id: product_id.to_string(),
            previous_stock,
            reconciled_stock,
        };
        if result.drift() != 0 {
            warn!(
                product_id = %product_id,
                previous = previous_stock,
                reconciled = reconciled_stock,
                "Product stock drifted from batch ledger"
            );
        }
        Ok(result)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Gets a batch of the tenant.
    pub async fn get(&self, ctx: &TenantContext, batch_id: &str) -> InventoryResult<Option<Batch>> {
        let sql = format!(
            r#"
            SELECT {BATCH_COLUMNS} FROM batches
            WHERE id = ?1 AND tenant_id = ?2
              AND product_id IN (SELECT id FROM products WHERE tenant_id = ?2 AND store_id = ?3)
            "#
        );
        let batch = sqlx::query_as::<_, Batch>(&sql)
            .bind(batch_id)
            .bind(&ctx.tenant_id)
            .bind(&ctx.store_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(batch)
    }

    /// Batches of a product ordered by expiry, then receipt.
    pub async fn list(
        &self,
        ctx: &TenantContext,
        product_id: &str,
        include_inactive: bool,
    ) -> InventoryResult<Vec<Batch>> {
        let product = ProductRepository::new(self.pool.clone()).get(ctx, product_id).await?;
        if product.is_none() {
            return Err(CoreError::ProductNotFound(product_id.to_string()).into());
        }

        let sql = format!(
            r#"
            SELECT {BATCH_COLUMNS} FROM batches
            WHERE product_id = ?1 AND tenant_id = ?2 AND (is_active = 1 OR ?3)
            ORDER BY expiry_date, created_at
            "#
        );
        let batches = sqlx::query_as::<_, Batch>(&sql)
            .bind(product_id)
            .bind(&ctx.tenant_id)
            .bind(include_inactive)
            .fetch_all(&self.pool)
            .await?;

        Ok(batches)
    }

    /// Active batches with stock left, in FIFO order. Expired batches are
    /// included; the allocation policy filters them against today.
    pub(crate) async fn candidates(
        &self,
        tenant_id: &str,
        product_id: &str,
    ) -> InventoryResult<Vec<Batch>> {
        debug!(product_id = %product_id, "Fetching candidate batches");

        let sql = format!(
            r#"
            SELECT {BATCH_COLUMNS} FROM batches
            WHERE product_id = ?1 AND tenant_id = ?2
              AND is_active = 1 AND remaining_quantity > 0
            ORDER BY expiry_date ASC, created_at ASC
            "#
        );
        let batches = sqlx::query_as::<_, Batch>(&sql)
            .bind(product_id)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(batches)
    }

    // =========================================================================
    // Transaction Helpers
    // =========================================================================

    /// Conditionally decrements a batch for a sale line.
    pub(crate) async fn decrement(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        product_id: &str,
        batch_id: &str,
        quantity: i64,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> InventoryResult<BatchSnapshot> {
        debug!(batch_id = %batch_id, quantity, "Decrementing batch");

        let snapshot = sqlx::query_as::<_, BatchSnapshot>(
            r#"
            UPDATE batches
            SET remaining_quantity = remaining_quantity - ?1, updated_at = ?2
            WHERE id = ?3 AND tenant_id = ?4 AND product_id = ?5
              AND is_active = 1 AND expiry_date > ?6
              AND remaining_quantity >= ?1
            RETURNING batch_number, expiry_date
            "#,
        )
        .bind(quantity)
        .bind(now)
        .bind(batch_id)
        .bind(tenant_id)
        .bind(product_id)
        .bind(today)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(snapshot) = snapshot {
            return Ok(snapshot);
        }

        let sql = format!("SELECT {BATCH_COLUMNS} FROM batches WHERE id = ?1 AND tenant_id = ?2 AND product_id = ?3");
        let current = sqlx::query_as::<_, Batch>(&sql)
            .bind(batch_id)
            .bind(tenant_id)
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

        let err = match current {
            Some(batch) if batch.is_active && batch.is_expired_on(today) => CoreError::BatchExpired {
                batch_number: batch.batch_number,
                expiry_date: batch.expiry_date,
            },
            Some(batch) if batch.is_active => {
                warn!(
                    batch_id = %batch_id,
                    available = batch.remaining_quantity,
                    requested = quantity,
                    "Batch oversold, rejecting sale"
                );
                CoreError::BatchOversold {
                    batch_id: batch.id,
                    batch_number: batch.batch_number,
                    available: batch.remaining_quantity,
                    requested: quantity,
                }
            }
            _ => CoreError::BatchNotFound(batch_id.to_string()),
        };

        Err(err.into())
    }

    /// Whether the product has any active batch.
    pub(crate) async fn has_active(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        product_id: &str,
    ) -> InventoryResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM batches WHERE product_id = ?1 AND tenant_id = ?2 AND is_active = 1",
        )
        .bind(product_id)
        .bind(tenant_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count > 0)
    }

    /// Whether the product ever had a batch, retired ones included.
    async fn has_history(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        product_id: &str,
    ) -> InventoryResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM batches WHERE product_id = ?1 AND tenant_id = ?2",
        )
        .bind(product_id)
        .bind(tenant_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count > 0)
    }
}
