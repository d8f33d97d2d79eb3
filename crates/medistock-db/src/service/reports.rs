//! # Sales Reports
//!
//! Aggregation only; formatting and export live with the caller.

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::debug;

use medistock_core::settlement::{SaleTotals, SalesSummary};
use medistock_core::{PaymentMethod, TenantContext, ValidationError};

use crate::error::InventoryResult;

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    payment_method: PaymentMethod,
    subtotal_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    units: i64,
}

#[derive(Debug, Clone)]
pub struct ReportService {
    pool: SqlitePool,
}

impl ReportService {
    pub fn new(pool: SqlitePool) -> Self {
        ReportService { pool }
    }

    /// Summarizes the store's sales between two UTC dates, both inclusive.
    pub async fn sales_summary(
        &self,
        ctx: &TenantContext,
        from_date: NaiveDate,
        to_date: NaiveDate,
    ) -> InventoryResult<SalesSummary> {
        if from_date > to_date {
            return Err(ValidationError::InvalidFormat {
                field: "to_date".to_string(),
                reason: format!("{} is before {}", to_date, from_date),
            }
            .into());
        }

        // created_at is stored as RFC 3339 text; the first ten chars are the UTC date
        let rows = sqlx::query_as::<_, SaleRow>(
            r#"
            SELECT
                s.payment_method,
                s.subtotal_cents,
                s.tax_cents,
                s.total_cents,
                COALESCE((SELECT SUM(i.quantity) FROM sale_items i WHERE i.sale_id = s.id), 0) AS units
            FROM sales s
            WHERE s.tenant_id = ?1 AND s.store_id = ?2
              AND substr(s.created_at, 1, 10) BETWEEN ?3 AND ?4
            ORDER BY s.created_at
            "#,
        )
        .bind(&ctx.tenant_id)
        .bind(&ctx.store_id)
        .bind(from_date.format("%Y-%m-%d").to_string())
        .bind(to_date.format("%Y-%m-%d").to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut summary = SalesSummary::empty(from_date, to_date);
        for row in rows {
            let totals = SaleTotals {
                subtotal_cents: row.subtotal_cents,
                tax_cents: row.tax_cents,
                total_cents: row.total_cents,
            };
            summary.record(row.payment_method, totals, row.units);
        }

        debug!(
            from = %from_date,
            to = %to_date,
            sales = summary.sale_count,
            "Sales summary computed"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{add_batch, add_product, setup, today};
    use chrono::Duration;
    use medistock_core::allocation::AllocationMode;
    use medistock_core::cart::Cart;
    use medistock_core::{CustomerInfo, PaymentMethod};

    #[tokio::test]
    async fn test_summary_by_payment_method() {
        let (db, ctx) = setup().await;
        let p = add_product(&db, &ctx, "AMOX-250", 1000).await;
        add_batch(&db, &ctx, &p.id, "B1", 90, 50).await;
        let product = db.products().require_active(&ctx, &p.id).await.unwrap();

        for (qty, method) in [(2, PaymentMethod::Cash), (3, PaymentMethod::Upi), (1, PaymentMethod::Cash)] {
            let alloc = db
                .allocation()
                .allocate(&ctx, &p.id, qty, AllocationMode::Auto, None)
                .await
                .unwrap();
            let mut cart = Cart::new();
            cart.add_allocated(&product, &alloc, qty).unwrap();
            db.settlement()
                .complete_sale(&ctx, &cart, CustomerInfo::default(), method)
                .await
                .unwrap();
        }

        let summary = db.reports().sales_summary(&ctx, today(), today()).await.unwrap();
        assert_eq!(summary.sale_count, 3);
        assert_eq!(summary.units_sold, 6);
        assert_eq!(summary.subtotal_cents, 6000);
        assert_eq!(summary.tax_cents, 720);
        assert_eq!(summary.total_cents, 6720);

        let cash = summary
            .by_payment_method
            .iter()
            .find(|m| m.payment_method == PaymentMethod::Cash)
            .unwrap();
        assert_eq!(cash.sale_count, 2);
        assert_eq!(cash.total_cents, 3360);

        let yesterday = today() - Duration::days(1);
        let empty = db.reports().sales_summary(&ctx, yesterday, yesterday).await.unwrap();
        assert_eq!(empty.sale_count, 0);
        assert!(empty.by_payment_method.is_empty());
    }

    #[tokio::test]
    async fn test_reversed_range_rejected() {
        let (db, ctx) = setup().await;
        let result = db
            .reports()
            .sales_summary(&ctx, today(), today() - Duration::days(1))
            .await;
        assert!(result.is_err());
    }
}
