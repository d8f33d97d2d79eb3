//! # Product Repository
//!
//! Catalog store operations.
//!
//! ## Key Operations
//! - Create/update with SKU uniqueness per store
//! - Lookup by id, SKU, barcode; prefix search
//! - Conditional stock decrement used by settlement
//!
//! ## Stock Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products.stock_quantity = Σ batches.remaining_quantity (active)       │
//! │                                                                         │
//! │  Written only by:                                                      │
//! │    BatchRepository::receive / retire / reconcile_stock                 │
//! │    SettlementCoordinator::complete_sale                                │
//! │  and always in the same transaction as the batch write.                │
//! │                                                                         │
//! │  update() never touches stock_quantity.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use medistock_core::validation::{
    validate_mrp, validate_new_product, validate_product_update, validate_search_query,
};
use medistock_core::{CoreError, NewProduct, Product, ProductUpdate, TenantContext, ValidationError};

use crate::error::InventoryResult;
use crate::repository::generate_id;

pub(crate) const PRODUCT_COLUMNS: &str = r#"
    id, tenant_id, store_id, sku, barcode, name, hsn_code,
    price_cents, mrp_cents, tax_rate_bps,
    stock_quantity, min_stock_level, min_batch_stock_level,
    is_active, created_at, updated_at
"#;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let products = db.products();
/// let product = products.create(&ctx, new_product).await?;
/// let found = products.find_by_barcode(&ctx, "8901234567890").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Creates a product in the context's store.
    ///
    /// ## Returns
    /// * `Err(Validation(Duplicate))` - an active product in the store has the SKU
    pub async fn create(&self, ctx: &TenantContext, input: NewProduct) -> InventoryResult<Product> {
        ctx.ensure_can_manage_inventory()?;
        validate_new_product(&input)?;

        let sku = input.sku.trim().to_string();
        let now = Utc::now();
        let product = Product {
            id: generate_id(),
            tenant_id: ctx.tenant_id.clone(),
            store_id: ctx.store_id.clone(),
            sku,
            barcode: non_empty(input.barcode),
            name: input.name.trim().to_string(),
            hsn_code: non_empty(input.hsn_code),
            price_cents: input.price_cents,
            mrp_cents: input.mrp_cents,
            tax_rate_bps: input.tax_rate_bps,
            stock_quantity: input.opening_stock,
            min_stock_level: input.min_stock_level,
            min_batch_stock_level: input.min_batch_stock_level,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(sku = %product.sku, "Inserting product");

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, store_id, sku, barcode, name, hsn_code,
                price_cents, mrp_cents, tax_rate_bps,
                stock_quantity, min_stock_level, min_batch_stock_level,
                is_active, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7,
                ?8, ?9, ?10,
                ?11, ?12, ?13,
                1, ?14, ?15
            )
            "#,
        )
        .bind(&product.id)
        .bind(&product.tenant_id)
        .bind(&product.store_id)
        .bind(&product.sku)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(&product.hsn_code)
        .bind(product.price_cents)
        .bind(product.mrp_cents)
        .bind(product.tax_rate_bps)
        .bind(product.stock_quantity)
        .bind(product.min_stock_level)
        .bind(product.min_batch_stock_level)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await?;

        // The insert holds the write lock, so a concurrent create of the
        // same SKU sees this row once it gets to run its own check
        let clashes: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM products
            WHERE sku = ?1 AND tenant_id = ?2 AND store_id = ?3 AND is_active = 1 AND id <> ?4
            "#,
        )
        .bind(&product.sku)
        .bind(&product.tenant_id)
        .bind(&product.store_id)
        .bind(&product.id)
        .fetch_one(&mut *tx)
        .await?;
        if clashes > 0 {
            return Err(ValidationError::duplicate("sku", product.sku).into());
        }

        tx.commit().await?;

        info!(product_id = %product.id, sku = %product.sku, "Product created");
        Ok(product)
    }

    /// Applies descriptive, pricing and threshold edits.
    pub async fn update(
        &self,
        ctx: &TenantContext,
        id: &str,
        update: ProductUpdate,
    ) -> InventoryResult<Product> {
        ctx.ensure_can_manage_inventory()?;
        validate_product_update(&update)?;

        let mut product = self.require_active(ctx, id).await?;

        if let Some(name) = update.name {
            product.name = name.trim().to_string();
        }
        if update.barcode.is_some() {
            product.barcode = non_empty(update.barcode);
        }
        if update.hsn_code.is_some() {
            product.hsn_code = non_empty(update.hsn_code);
        }
        if let Some(price) = update.price_cents {
            product.price_cents = price;
        }
        if let Some(mrp) = update.mrp_cents {
            product.mrp_cents = mrp;
        }
        if let Some(bps) = update.tax_rate_bps {
            product.tax_rate_bps = bps;
        }
        if let Some(level) = update.min_stock_level {
            product.min_stock_level = level;
        }
        if let Some(level) = update.min_batch_stock_level {
            product.min_batch_stock_level = level;
        }
        validate_mrp(product.price_cents, product.mrp_cents)?;
        product.updated_at = Utc::now();

        debug!(product_id = %id, "Updating product");

        sqlx::query(
            r#"
            UPDATE products SET
                name = ?1,
                barcode = ?2,
                hsn_code = ?3,
                price_cents = ?4,
                mrp_cents = ?5,
                tax_rate_bps = ?6,
                min_stock_level = ?7,
                min_batch_stock_level = ?8,
                updated_at = ?9
            WHERE id = ?10 AND tenant_id = ?11 AND store_id = ?12
            "#,
        )
        .bind(&product.name)
        .bind(&product.barcode)
        .bind(&product.hsn_code)
        .bind(product.price_cents)
        .bind(product.mrp_cents)
        .bind(product.tax_rate_bps)
        .bind(product.min_stock_level)
        .bind(product.min_batch_stock_level)
        .bind(product.updated_at)
        .bind(&product.id)
        .bind(&ctx.tenant_id)
        .bind(&ctx.store_id)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Soft-deletes a product. Its batches and sale history stay intact.
    pub async fn deactivate(&self, ctx: &TenantContext, id: &str) -> InventoryResult<()> {
        ctx.ensure_can_manage_inventory()?;

        let result = sqlx::query(
            r#"
            UPDATE products SET is_active = 0, updated_at = ?1
            WHERE id = ?2 AND tenant_id = ?3 AND store_id = ?4 AND is_active = 1
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .bind(&ctx.tenant_id)
        .bind(&ctx.store_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }

        info!(product_id = %id, "Product deactivated");
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Gets a product of the context's store, active or not.
    pub async fn get(&self, ctx: &TenantContext, id: &str) -> InventoryResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, ctx, id).await
    }

    /// Gets an active product or fails with `ProductNotFound`.
    pub async fn require_active(&self, ctx: &TenantContext, id: &str) -> InventoryResult<Product> {
        match self.get(ctx, id).await? {
            Some(product) if product.is_active => Ok(product),
            _ => Err(CoreError::ProductNotFound(id.to_string()).into()),
        }
    }

    /// Active product with the given SKU.
    pub async fn find_by_sku(&self, ctx: &TenantContext, sku: &str) -> InventoryResult<Option<Product>> {
        self.find_by_column(ctx, "sku", sku.trim()).await
    }

    /// Active product with the given barcode (scan lookup).
    pub async fn find_by_barcode(
        &self,
        ctx: &TenantContext,
        barcode: &str,
    ) -> InventoryResult<Option<Product>> {
        self.find_by_column(ctx, "barcode", barcode.trim()).await
    }

    async fn find_by_column(
        &self,
        ctx: &TenantContext,
        column: &'static str,
        value: &str,
    ) -> InventoryResult<Option<Product>> {
        debug!(column, value = %value, "Looking up product");

        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE {column} = ?1 AND tenant_id = ?2 AND store_id = ?3 AND is_active = 1
            ORDER BY created_at
            LIMIT 1
            "#
        );

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(value)
            .bind(&ctx.tenant_id)
            .bind(&ctx.store_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Prefix search over name, SKU and barcode among active products.
    /// An empty query lists products by name.
    pub async fn search(
        &self,
        ctx: &TenantContext,
        query: &str,
        limit: u32,
    ) -> InventoryResult<Vec<Product>> {
        let query = validate_search_query(query)?;
        let pattern = format!("{}%", escape_like(&query));

        debug!(query = %query, limit, "Searching products");

        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE tenant_id = ?1 AND store_id = ?2 AND is_active = 1
              AND (name LIKE ?3 ESCAPE '\' OR sku LIKE ?3 ESCAPE '\' OR barcode LIKE ?3 ESCAPE '\')
            ORDER BY name
            LIMIT ?4
            "#
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(&ctx.tenant_id)
            .bind(&ctx.store_id)
            .bind(&pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Active products at or below `min_stock_level`, lowest stock first.
    pub async fn low_stock(&self, ctx: &TenantContext) -> InventoryResult<Vec<Product>> {
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE tenant_id = ?1 AND store_id = ?2 AND is_active = 1
              AND stock_quantity <= min_stock_level
            ORDER BY stock_quantity, name, id
            "#
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(&ctx.tenant_id)
            .bind(&ctx.store_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    // =========================================================================
    // Transaction Helpers
    // =========================================================================

    /// Fetches a product of the context's store on the given connection.
    pub(crate) async fn fetch(
        conn: &mut SqliteConnection,
        ctx: &TenantContext,
        id: &str,
    ) -> InventoryResult<Option<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND tenant_id = ?2 AND store_id = ?3"
        );

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(&ctx.tenant_id)
            .bind(&ctx.store_id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(product)
    }

    /// Adds `delta` (positive or negative) to stock, never below zero.
    ///
    /// ## Returns
    /// * `Err(InsufficientStock)` - the decrement would make stock negative
    pub(crate) async fn adjust_stock(
        conn: &mut SqliteConnection,
        product: &Product,
        delta: i64,
        now: DateTime<Utc>,
    ) -> InventoryResult<()> {
        debug!(product_id = %product.id, delta, "Adjusting product stock");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + ?1, updated_at = ?2
            WHERE id = ?3 AND tenant_id = ?4 AND stock_quantity + ?1 >= 0
            "#,
        )
        .bind(delta)
        .bind(now)
        .bind(&product.id)
        .bind(&product.tenant_id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            let available: i64 = sqlx::query_scalar(
                "SELECT stock_quantity FROM products WHERE id = ?1 AND tenant_id = ?2",
            )
            .bind(&product.id)
            .bind(&product.tenant_id)
            .fetch_optional(&mut *conn)
            .await?
            .unwrap_or(0);

            return Err(CoreError::InsufficientStock {
                sku: product.sku.clone(),
                available,
                requested: -delta,
            }
            .into());
        }

        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InventoryError;
    use crate::test_support::{new_product, setup};
    use medistock_core::{Role, MAX_PRICE_CENTS};

    #[tokio::test]
    async fn test_create_and_lookup() {
        let (db, ctx) = setup().await;
        let products = db.products();

        let created = products
            .create(
                &ctx,
                NewProduct {
                    barcode: Some("8901234567890".to_string()),
                    ..new_product("PARA-500", 3310, 1200)
                },
            )
            .await
            .unwrap();
        assert_eq!(created.stock_quantity, 0);

        let by_sku = products.find_by_sku(&ctx, "PARA-500").await.unwrap().unwrap();
        assert_eq!(by_sku.id, created.id);

        let by_barcode = products
            .find_by_barcode(&ctx, "8901234567890")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_barcode.id, created.id);
        assert_eq!(by_barcode.tax_rate_bps, 1200);
        assert_eq!(by_barcode.min_batch_stock_level, None);
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let (db, ctx) = setup().await;
        let products = db.products();

        products.create(&ctx, new_product("PARA-500", 3310, 1200)).await.unwrap();
        let err = products
            .create(&ctx, new_product("PARA-500", 2000, 500))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InventoryError::Domain(CoreError::Validation(ValidationError::Duplicate { .. }))
        ));
    }

    #[tokio::test]
    async fn test_cashier_cannot_create() {
        let (db, ctx) = setup().await;
        let cashier = TenantContext {
            role: Role::Cashier,
            ..ctx
        };
        let err = db
            .products()
            .create(&cashier, new_product("PARA-500", 3310, 1200))
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::Domain(CoreError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn test_update_keeps_stock_and_enforces_mrp() {
        let (db, ctx) = setup().await;
        let products = db.products();
        let p = products
            .create(
                &ctx,
                NewProduct {
                    opening_stock: 12,
                    mrp_cents: Some(4000),
                    ..new_product("ORS-1", 2500, 500)
                },
            )
            .await
            .unwrap();

        let updated = products
            .update(
                &ctx,
                &p.id,
                ProductUpdate {
                    name: Some("ORS Sachet".to_string()),
                    min_batch_stock_level: Some(Some(8)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "ORS Sachet");
        assert_eq!(updated.stock_quantity, 12);
        assert_eq!(updated.min_batch_stock_level, Some(8));

        let err = products
            .update(
                &ctx,
                &p.id,
                ProductUpdate {
                    price_cents: Some(4500),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_clears_nullable_fields() {
        let (db, ctx) = setup().await;
        let products = db.products();
        let p = products
            .create(
                &ctx,
                NewProduct {
                    mrp_cents: Some(4000),
                    min_batch_stock_level: Some(12),
                    ..new_product("ORS-1", 2500, 500)
                },
            )
            .await
            .unwrap();

        let cleared = products
            .update(
                &ctx,
                &p.id,
                ProductUpdate {
                    mrp_cents: Some(None),
                    min_batch_stock_level: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.mrp_cents, None);
        assert_eq!(cleared.min_batch_stock_level, None);

        // With no MRP the old ceiling no longer applies
        let repriced = products
            .update(
                &ctx,
                &p.id,
                ProductUpdate {
                    price_cents: Some(4500),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(repriced.price_cents, 4500);

        let stored = products.get(&ctx, &p.id).await.unwrap().unwrap();
        assert_eq!(stored.mrp_cents, None);
        assert_eq!(stored.min_batch_stock_level, None);
    }

    #[tokio::test]
    async fn test_price_ceiling() {
        let (db, ctx) = setup().await;
        let products = db.products();

        products
            .create(&ctx, new_product("INSU-1", MAX_PRICE_CENTS, 1200))
            .await
            .unwrap();

        let err = products
            .create(&ctx, new_product("INSU-2", MAX_PRICE_CENTS + 1, 1200))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InventoryError::Domain(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        let p = products.find_by_sku(&ctx, "INSU-1").await.unwrap().unwrap();
        let err = products
            .update(
                &ctx,
                &p.id,
                ProductUpdate {
                    price_cents: Some(i64::MAX / 2),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_search_prefix() {
        let (db, ctx) = setup().await;
        let products = db.products();
        products.create(&ctx, new_product("PARA-500", 3310, 1200)).await.unwrap();
        products.create(&ctx, new_product("PARA-650", 4200, 1200)).await.unwrap();
        products.create(&ctx, new_product("CETI-10", 1800, 1200)).await.unwrap();

        assert_eq!(products.search(&ctx, "PARA", 10).await.unwrap().len(), 2);
        assert_eq!(products.search(&ctx, "", 10).await.unwrap().len(), 3);
        assert!(products.search(&ctx, "%", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deactivate_hides_product() {
        let (db, ctx) = setup().await;
        let products = db.products();
        let p = products.create(&ctx, new_product("PARA-500", 3310, 1200)).await.unwrap();

        products.deactivate(&ctx, &p.id).await.unwrap();
        assert!(products.find_by_sku(&ctx, "PARA-500").await.unwrap().is_none());
        assert!(!products.get(&ctx, &p.id).await.unwrap().unwrap().is_active);

        // SKU is free again once the old product is inactive
        products.create(&ctx, new_product("PARA-500", 3310, 1200)).await.unwrap();
    }

    #[tokio::test]
    async fn test_low_stock_products() {
        let (db, ctx) = setup().await;
        let products = db.products();
        products
            .create(
                &ctx,
                NewProduct {
                    opening_stock: 3,
                    min_stock_level: 5,
                    ..new_product("LOW-1", 100, 0)
                },
            )
            .await
            .unwrap();
        products
            .create(
                &ctx,
                NewProduct {
                    opening_stock: 50,
                    min_stock_level: 5,
                    ..new_product("OK-1", 100, 0)
                },
            )
            .await
            .unwrap();

        let low = products.low_stock(&ctx).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].sku, "LOW-1");
    }
}
