//! Fixtures shared by the unit tests of this crate.

use chrono::{Duration, NaiveDate, Utc};

use medistock_core::{Batch, NewBatch, NewProduct, Product, Role, TenantContext};

use crate::pool::{Database, DbConfig};

/// Fresh in-memory database with one tenant and store; returns an owner context.
pub(crate) async fn setup() -> (Database, TenantContext) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let tenant = db.tenants().create_tenant("Test Pharmacy").await.unwrap();
    let store = db.tenants().create_store(&tenant.id, "Main Street").await.unwrap();
    let ctx = TenantContext::new("user-1", &tenant.id, &store.id, Role::Owner);
    (db, ctx)
}

pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub(crate) fn new_product(sku: &str, price_cents: i64, tax_rate_bps: u32) -> NewProduct {
    NewProduct {
        sku: sku.to_string(),
        name: format!("Product {}", sku),
        price_cents,
        tax_rate_bps,
        ..NewProduct::default()
    }
}

pub(crate) fn new_batch(product_id: &str, batch_number: &str, days_to_expiry: i64, quantity: i64) -> NewBatch {
    NewBatch {
        product_id: product_id.to_string(),
        batch_number: batch_number.to_string(),
        manufacturing_date: None,
        expiry_date: today() + Duration::days(days_to_expiry),
        purchase_price_cents: 100,
        quantity,
    }
}

/// Creates a product taxed at 12%.
pub(crate) async fn add_product(db: &Database, ctx: &TenantContext, sku: &str, price_cents: i64) -> Product {
    db.products()
        .create(ctx, new_product(sku, price_cents, 1200))
        .await
        .unwrap()
}

pub(crate) async fn add_batch(
    db: &Database,
    ctx: &TenantContext,
    product_id: &str,
    batch_number: &str,
    days_to_expiry: i64,
    quantity: i64,
) -> Batch {
    db.batches()
        .receive(ctx, new_batch(product_id, batch_number, days_to_expiry, quantity))
        .await
        .unwrap()
}
