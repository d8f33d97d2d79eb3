//! # Alert Projector
//!
//! Read-time projections over the batch ledger. Nothing is cached; two calls
//! with no write in between return the same rows in the same order.

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::debug;

use medistock_core::alerts::{alert_cutoff, BatchAlert, ExpiryAlerts};
use medistock_core::{Product, TenantContext, ValidationError};

use crate::config::InventorySettings;
use crate::error::InventoryResult;
use crate::repository::product::ProductRepository;
use crate::service::today;

const MAX_HORIZON_DAYS: i64 = 3650;

const ALERT_SELECT: &str = r#"
    SELECT
        b.id AS batch_id,
        b.product_id,
        p.sku,
        p.name AS product_name,
        b.batch_number,
        b.expiry_date,
        b.remaining_quantity,
        COALESCE(p.min_batch_stock_level, ?3) AS threshold
    FROM batches b
    JOIN products p ON p.id = b.product_id
    WHERE b.tenant_id = ?1 AND p.tenant_id = ?1 AND p.store_id = ?2
      AND b.is_active = 1
"#;

#[derive(Debug, Clone)]
pub struct AlertProjector {
    pool: SqlitePool,
    settings: Arc<InventorySettings>,
}

impl AlertProjector {
    pub fn new(pool: SqlitePool, settings: Arc<InventorySettings>) -> Self {
        AlertProjector { pool, settings }
    }

    /// Active batches with `0 < remaining <= threshold`. The threshold is the
    /// product's `min_batch_stock_level`, or the configured default when unset.
    pub async fn low_stock_batches(&self, ctx: &TenantContext) -> InventoryResult<Vec<BatchAlert>> {
        let sql = format!(
            r#"
            {ALERT_SELECT}
              AND b.remaining_quantity > 0
              AND b.remaining_quantity <= COALESCE(p.min_batch_stock_level, ?3)
            ORDER BY b.remaining_quantity ASC, b.expiry_date ASC, b.id ASC
            "#
        );

        let alerts = sqlx::query_as::<_, BatchAlert>(&sql)
            .bind(&ctx.tenant_id)
            .bind(&ctx.store_id)
            .bind(self.settings.default_min_batch_stock)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = alerts.len(), "Low-stock batches projected");
        Ok(alerts)
    }

    /// Active batches expiring within `horizon_days` (configured default when
    /// `None`), split into expired and expiring soon.
    pub async fn expiry_alerts(
        &self,
        ctx: &TenantContext,
        horizon_days: Option<i64>,
    ) -> InventoryResult<ExpiryAlerts> {
        let horizon = horizon_days.unwrap_or(self.settings.expiry_warning_days);
        if !(0..=MAX_HORIZON_DAYS).contains(&horizon) {
            return Err(ValidationError::OutOfRange {
                field: "horizon_days".to_string(),
                min: 0,
                max: MAX_HORIZON_DAYS,
            }
            .into());
        }

        let today = today();
        let sql = format!(
            r#"
            {ALERT_SELECT}
              AND b.expiry_date <= ?4
            ORDER BY b.expiry_date ASC, b.id ASC
            "#
        );

        let candidates = sqlx::query_as::<_, BatchAlert>(&sql)
            .bind(&ctx.tenant_id)
            .bind(&ctx.store_id)
            .bind(self.settings.default_min_batch_stock)
            .bind(alert_cutoff(today, horizon))
            .fetch_all(&self.pool)
            .await?;

        let alerts = ExpiryAlerts::partition(candidates, today, horizon);
        debug!(
            expired = alerts.expired.len(),
            expiring_soon = alerts.expiring_soon.len(),
            horizon,
            "Expiry alerts projected"
        );
        Ok(alerts)
    }

    /// Active products at or below their product-level minimum.
    pub async fn low_stock_products(&self, ctx: &TenantContext) -> InventoryResult<Vec<Product>> {
        ProductRepository::new(self.pool.clone()).low_stock(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use crate::error::InventoryError;
    use crate::test_support::{add_batch, add_product, new_product, setup};
    use medistock_core::alerts::ExpiryStatus;
    use medistock_core::{CoreError, NewProduct, ProductUpdate, ValidationError};

    #[tokio::test]
    async fn test_low_stock_batches_default_threshold() {
        let (db, ctx) = setup().await;
        let p = add_product(&db, &ctx, "AMOX-250", 1000).await;
        add_batch(&db, &ctx, &p.id, "LOW", 90, 5).await;
        add_batch(&db, &ctx, &p.id, "OK", 120, 6).await;

        let custom = db
            .products()
            .create(
                &ctx,
                NewProduct {
                    min_batch_stock_level: Some(10),
                    ..new_product("PARA-500", 300, 500)
                },
            )
            .await
            .unwrap();
        add_batch(&db, &ctx, &custom.id, "P1", 90, 8).await;

        let alerts = db.alerts().low_stock_batches(&ctx).await.unwrap();
        let numbers: Vec<&str> = alerts.iter().map(|a| a.batch_number.as_str()).collect();
        assert_eq!(numbers, vec!["LOW", "P1"]);
        assert_eq!(alerts[0].threshold, 5);
        assert_eq!(alerts[1].threshold, 10);

        // No writes in between: identical result
        let again = db.alerts().low_stock_batches(&ctx).await.unwrap();
        assert_eq!(alerts, again);
    }

    #[tokio::test]
    async fn test_expiry_alert_buckets() {
        let (db, ctx) = setup().await;
        let p = add_product(&db, &ctx, "AMOX-250", 1000).await;
        add_batch(&db, &ctx, &p.id, "PAST", -2, 10).await;
        add_batch(&db, &ctx, &p.id, "TODAY", 0, 10).await;
        add_batch(&db, &ctx, &p.id, "SOON", 20, 10).await;
        add_batch(&db, &ctx, &p.id, "LATER", 45, 10).await;

        let alerts = db.alerts().expiry_alerts(&ctx, None).await.unwrap();
        assert_eq!(alerts.expired.len(), 2);
        assert_eq!(alerts.expired[0].batch.batch_number, "PAST");
        assert_eq!(alerts.expired[0].status, ExpiryStatus::Expired { days_past: 2 });
        assert_eq!(alerts.expired[1].status, ExpiryStatus::Expired { days_past: 0 });
        assert_eq!(alerts.expiring_soon.len(), 1);
        assert_eq!(
            alerts.expiring_soon[0].status,
            ExpiryStatus::ExpiringSoon { days_remaining: 20 }
        );

        let wide = db.alerts().expiry_alerts(&ctx, Some(60)).await.unwrap();
        assert_eq!(wide.expiring_soon.len(), 2);

        let err = db.alerts().expiry_alerts(&ctx, Some(-1)).await.unwrap_err();
        assert!(matches!(
            err,
            InventoryError::Domain(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }

    #[tokio::test]
    async fn test_retired_batches_not_alerted() {
        let (db, ctx) = setup().await;
        let p = add_product(&db, &ctx, "AMOX-250", 1000).await;
        let b = add_batch(&db, &ctx, &p.id, "LOW", 5, 2).await;

        assert_eq!(db.alerts().low_stock_batches(&ctx).await.unwrap().len(), 1);
        db.batches().retire(&ctx, &b.id).await.unwrap();
        assert!(db.alerts().low_stock_batches(&ctx).await.unwrap().is_empty());
        assert!(db.alerts().expiry_alerts(&ctx, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_low_stock_products() {
        let (db, ctx) = setup().await;
        let p = db
            .products()
            .create(
                &ctx,
                NewProduct {
                    min_stock_level: 10,
                    ..new_product("AMOX-250", 1000, 1200)
                },
            )
            .await
            .unwrap();
        add_batch(&db, &ctx, &p.id, "B1", 90, 8).await;

        let low = db.alerts().low_stock_products(&ctx).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].id, p.id);
    }

    #[tokio::test]
    async fn test_cleared_threshold_falls_back_to_default() {
        let (db, ctx) = setup().await;
        let p = db
            .products()
            .create(
                &ctx,
                NewProduct {
                    min_batch_stock_level: Some(10),
                    ..new_product("PARA-500", 300, 500)
                },
            )
            .await
            .unwrap();
        add_batch(&db, &ctx, &p.id, "P1", 90, 8).await;
        assert_eq!(db.alerts().low_stock_batches(&ctx).await.unwrap().len(), 1);

        db.products()
            .update(
                &ctx,
                &p.id,
                ProductUpdate {
                    min_batch_stock_level: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // 8 is above the store-wide default of 5
        assert!(db.alerts().low_stock_batches(&ctx).await.unwrap().is_empty());
    }
}
