//! # Sale Repository
//!
//! Sale history. Sales are written only by settlement, inside its
//! transaction, and are never amended afterwards.
//!
//! ## Snapshot Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sale_items copies sku, name, hsn, batch number and expiry at checkout. │
//! │  Renaming a product or retiring a batch later does not change history.  │
//! │  product_id / batch_id are kept only as weak references.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use medistock_core::{CompletedSale, Sale, SaleItem, TenantContext};

use crate::error::{DbError, DbResult, InventoryResult};

const SALE_COLUMNS: &str = r#"
    id, tenant_id, store_id, invoice_number, customer_name, customer_phone,
    subtotal_cents, tax_cents, total_cents, payment_method, created_by, created_at
"#;

const SALE_ITEM_COLUMNS: &str = r#"
    id, sale_id, product_id, batch_id, sku_snapshot, name_snapshot,
    hsn_snapshot, batch_number_snapshot, expiry_snapshot, quantity,
    unit_price_cents, tax_rate_bps, tax_cents, line_total_cents, created_at
"#;

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale of the context's store with its items.
    pub async fn get(&self, ctx: &TenantContext, sale_id: &str) -> InventoryResult<Option<CompletedSale>> {
        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1 AND tenant_id = ?2 AND store_id = ?3"
        );
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(sale_id)
            .bind(&ctx.tenant_id)
            .bind(&ctx.store_id)
            .fetch_optional(&self.pool)
            .await?;

        self.with_items(sale).await
    }

    /// Looks a sale up by its invoice number, e.g. for a reprint.
    pub async fn get_by_invoice(
        &self,
        ctx: &TenantContext,
        invoice_number: &str,
    ) -> InventoryResult<Option<CompletedSale>> {
        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE invoice_number = ?1 AND tenant_id = ?2 AND store_id = ?3"
        );
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(invoice_number.trim())
            .bind(&ctx.tenant_id)
            .bind(&ctx.store_id)
            .fetch_optional(&self.pool)
            .await?;

        self.with_items(sale).await
    }

    /// Most recent sales of the store, newest first. Headers only.
    pub async fn list_recent(&self, ctx: &TenantContext, limit: u32) -> InventoryResult<Vec<Sale>> {
        let sql = format!(
            r#"
            SELECT {SALE_COLUMNS} FROM sales
            WHERE tenant_id = ?1 AND store_id = ?2
            ORDER BY created_at DESC, invoice_number DESC
            LIMIT ?3
            "#
        );
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(&ctx.tenant_id)
            .bind(&ctx.store_id)
            .bind(limit.clamp(1, 500))
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    /// Items of a sale in insertion order.
    pub async fn items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let sql = format!(
            "SELECT {SALE_ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY rowid"
        );
        let items = sqlx::query_as::<_, SaleItem>(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    async fn with_items(&self, sale: Option<Sale>) -> InventoryResult<Option<CompletedSale>> {
        match sale {
            Some(sale) => {
                let items = self.items(&sale.id).await?;
                Ok(Some(CompletedSale { sale, items }))
            }
            None => Ok(None),
        }
    }

    // =========================================================================
    // Transaction Helpers
    // =========================================================================

    /// Inserts a sale header.
    ///
    /// ## Returns
    /// * `Err(DuplicateInvoiceNumber)` - the tenant already used this number
    pub(crate) async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, invoice_number = %sale.invoice_number, "Inserting sale");

        let sql = format!(
            r#"
            INSERT INTO sales ({SALE_COLUMNS})
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#
        );
        sqlx::query(&sql)
            .bind(&sale.id)
            .bind(&sale.tenant_id)
            .bind(&sale.store_id)
            .bind(&sale.invoice_number)
            .bind(&sale.customer_name)
            .bind(&sale.customer_phone)
            .bind(sale.subtotal_cents)
            .bind(sale.tax_cents)
            .bind(sale.total_cents)
            .bind(sale.payment_method)
            .bind(&sale.created_by)
            .bind(sale.created_at)
            .execute(&mut *conn)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::DuplicateInvoiceNumber(_) => {
                    DbError::DuplicateInvoiceNumber(sale.invoice_number.clone())
                }
                other => other,
            })?;

        Ok(())
    }

    /// Inserts one sale item.
    pub(crate) async fn insert_item(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
        debug!(sale_id = %item.sale_id, product_id = %item.product_id, "Inserting sale item");

        let sql = format!(
            r#"
            INSERT INTO sale_items ({SALE_ITEM_COLUMNS})
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#
        );
        sqlx::query(&sql)
            .bind(&item.id)
            .bind(&item.sale_id)
            .bind(&item.product_id)
            .bind(&item.batch_id)
            .bind(&item.sku_snapshot)
            .bind(&item.name_snapshot)
            .bind(&item.hsn_snapshot)
            .bind(&item.batch_number_snapshot)
            .bind(item.expiry_snapshot)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.tax_rate_bps)
            .bind(item.tax_cents)
            .bind(item.line_total_cents)
            .bind(item.created_at)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }
}
