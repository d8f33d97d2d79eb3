//! # Sale Settlement
//!
//! Turns a cart into a persisted sale. Everything happens in one SQLite
//! transaction; any failure rolls all of it back and leaves the cart as it
//! was, so the cashier can fix the line and retry.
//!
//! ## Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   1. INSERT sale            (first statement is a write: the write     │
//! │                              lock is taken up front, terminals queue)  │
//! │        └── UNIQUE(invoice) → fresh number, retry, bounded              │
//! │   2. for each line:                                                    │
//! │        product still active in store?          → ProductNotFound      │
//! │        batch line:   conditional decrement     → BatchOversold /      │
//! │                                                  BatchExpired /        │
//! │                                                  BatchNotFound         │
//! │        no batch id:  product has active batches → batch_id required   │
//! │        conditional product stock decrement     → InsufficientStock    │
//! │        INSERT sale item with snapshots                                 │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use medistock_core::cart::Cart;
use medistock_core::invoice::InvoiceSequence;
use medistock_core::settlement::validate_checkout;
use medistock_core::validation::validate_customer;
use medistock_core::{
    CompletedSale, CoreError, CustomerInfo, PaymentMethod, Sale, SaleItem, TenantContext,
    ValidationError,
};

use crate::config::InventorySettings;
use crate::error::{DbError, InventoryError, InventoryResult};
use crate::repository::batch::BatchRepository;
use crate::repository::generate_id;
use crate::repository::product::ProductRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::tenant::TenantRepository;
use crate::service::today;

#[derive(Debug, Clone)]
pub struct SettlementCoordinator {
    pool: SqlitePool,
    settings: Arc<InventorySettings>,
    invoices: Arc<InvoiceSequence>,
}

impl SettlementCoordinator {
    pub fn new(
        pool: SqlitePool,
        settings: Arc<InventorySettings>,
        invoices: Arc<InvoiceSequence>,
    ) -> Self {
        SettlementCoordinator {
            pool,
            settings,
            invoices,
        }
    }

    /// Settles a cart as a sale.
    ///
    /// Line prices come from the cart; product and batch snapshots are read
    /// inside the transaction.
    ///
    /// ## Returns
    /// * `Ok(CompletedSale)` - committed sale with its items, in cart order
    /// * `Err(BatchOversold)` - another terminal sold the units first
    /// * `Err(Persistence(DuplicateInvoiceNumber))` - retries exhausted
    pub async fn complete_sale(
        &self,
        ctx: &TenantContext,
        cart: &Cart,
        customer: CustomerInfo,
        payment_method: PaymentMethod,
    ) -> InventoryResult<CompletedSale> {
        ctx.ensure_can_sell()?;
        validate_checkout(cart)?;
        validate_customer(&customer)?;

        TenantRepository::new(self.pool.clone())
            .require_active_store(ctx)
            .await?;

        let totals = cart.totals()?;
        let now = Utc::now();
        let today = today();

        let mut sale = Sale {
            id: generate_id(),
            tenant_id: ctx.tenant_id.clone(),
            store_id: ctx.store_id.clone(),
            invoice_number: self.invoices.next(),
            customer_name: trimmed(customer.name),
            customer_phone: trimmed(customer.phone),
            subtotal_cents: totals.subtotal_cents,
            tax_cents: totals.tax_cents,
            total_cents: totals.total_cents,
            payment_method,
            created_by: ctx.user_id.clone(),
            created_at: now,
        };

        debug!(
            lines = cart.line_count(),
            total = totals.total_cents,
            "Settling sale"
        );

        let mut tx = self.pool.begin().await?;

        let attempts = self.settings.invoice_retry_attempts.max(1);
        let mut attempt = 1;
        loop {
            match SaleRepository::insert_sale(&mut tx, &sale).await {
                Ok(()) => break,
                Err(DbError::DuplicateInvoiceNumber(number)) if attempt < attempts => {
                    warn!(invoice_number = %number, attempt, "Invoice number taken, regenerating");
                    sale.invoice_number = self.invoices.next();
                    attempt += 1;
                }
                Err(e) => return Err(InventoryError::Persistence(e)),
            }
        }

        let mut items = Vec::with_capacity(cart.line_count());
        for line in &cart.lines {
            let product = match ProductRepository::fetch(&mut tx, ctx, &line.product_id).await? {
                Some(p) if p.is_active => p,
                _ => return Err(CoreError::ProductNotFound(line.product_id.clone()).into()),
            };

            let snapshot = match &line.batch_id {
                Some(batch_id) => Some(
                    BatchRepository::decrement(
                        &mut tx,
                        &ctx.tenant_id,
                        &product.id,
                        batch_id,
                        line.quantity,
                        today,
                        now,
                    )
                    .await?,
                ),
                None => {
                    if BatchRepository::has_active(&mut tx, &ctx.tenant_id, &product.id).await? {
                        return Err(ValidationError::required("batch_id").into());
                    }
                    None
                }
            };

            ProductRepository::adjust_stock(&mut tx, &product, -line.quantity, now).await?;

            let amounts = line.amounts()?;
            let (batch_number_snapshot, expiry_snapshot) = match snapshot {
                Some(s) => (Some(s.batch_number), Some(s.expiry_date)),
                None => (None, None),
            };
            let item = SaleItem {
                id: generate_id(),
                sale_id: sale.id.clone(),
                product_id: product.id.clone(),
                batch_id: line.batch_id.clone(),
                sku_snapshot: product.sku,
                name_snapshot: product.name,
                hsn_snapshot: product.hsn_code,
                batch_number_snapshot,
                expiry_snapshot,
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
                tax_rate_bps: line.tax_rate_bps,
                tax_cents: amounts.tax_cents,
                line_total_cents: amounts.line_total_cents,
                created_at: now,
            };
            SaleRepository::insert_item(&mut tx, &item).await?;
            items.push(item);
        }

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            invoice_number = %sale.invoice_number,
            total = sale.total_cents,
            items = items.len(),
            "Sale completed"
        );
        Ok(CompletedSale { sale, items })
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
