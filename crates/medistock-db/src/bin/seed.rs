//! # Seed Data Generator
//!
//! Populates a development database with a demo pharmacy.
//!
//! ## Usage
//! ```bash
//! # 200 products (default)
//! cargo run -p medistock-db --bin seed
//!
//! # Custom amount and database path
//! cargo run -p medistock-db --bin seed -- --count 1000 --db ./data/medistock.db
//! ```
//!
//! ## Generated Data
//! One tenant with one store. Every product receives two or three batches
//! so the alert views have something to show:
//! - an expired batch on every 7th product
//! - a batch expiring within the warning horizon on every 3rd product
//! - a low batch (below the default threshold) on every 5th product
//!
//! A handful of sales are then settled through the normal checkout path.

use std::env;

use chrono::{Duration, Utc};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use medistock_core::allocation::AllocationMode;
use medistock_core::cart::Cart;
use medistock_core::{CustomerInfo, NewBatch, NewProduct, PaymentMethod, Role, TenantContext};
use medistock_db::{Database, DbConfig};

/// (SKU stem, name, HSN code) of common generics.
const MEDICINES: &[(&str, &str, &str)] = &[
    ("PARA", "Paracetamol", "30049099"),
    ("AMOX", "Amoxicillin", "30041010"),
    ("AZIT", "Azithromycin", "30042019"),
    ("CETI", "Cetirizine", "30049099"),
    ("METF", "Metformin", "30049099"),
    ("ATOR", "Atorvastatin", "30049099"),
    ("OMEP", "Omeprazole", "30049099"),
    ("PANT", "Pantoprazole", "30049099"),
    ("IBUP", "Ibuprofen", "30049099"),
    ("DICL", "Diclofenac", "30049099"),
    ("AMLO", "Amlodipine", "30049099"),
    ("LOSA", "Losartan", "30049099"),
    ("MONT", "Montelukast", "30049099"),
    ("LEVO", "Levocetirizine", "30049099"),
    ("DOXY", "Doxycycline", "30042019"),
    ("CIPR", "Ciprofloxacin", "30042019"),
    ("ORS", "Oral Rehydration Salts", "30049099"),
    ("VITC", "Vitamin C", "30045010"),
    ("VITD", "Vitamin D3", "30045010"),
    ("ZINC", "Zinc Sulphate", "30049099"),
];

/// Strengths with a price add-on in paise.
const STRENGTHS: &[(&str, i64)] = &[
    ("100mg", 0),
    ("250mg", 1500),
    ("500mg", 3000),
    ("650mg", 4200),
    ("1000mg", 7500),
];

/// GST slabs in basis points
const TAX_RATES: &[u32] = &[0, 500, 1200, 1800];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./medistock_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("MediStock Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./medistock_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("MediStock Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(db.pool())
        .await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let tenant = db.tenants().create_tenant("Demo Pharmacy").await?;
    let store = db.tenants().create_store(&tenant.id, "Main Road Branch").await?;
    let ctx = TenantContext::new("seed", &tenant.id, &store.id, Role::Owner);
    println!("✓ Tenant {} / store {}", tenant.id, store.id);

    println!();
    println!("Generating products and batches...");

    let start = std::time::Instant::now();
    let mut product_ids = Vec::with_capacity(count);
    let mut batches = 0;

    for seed in 0..count {
        let input = generate_product(seed);
        let sku = input.sku.clone();
        let product = match db.products().create(&ctx, input).await {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Failed to insert {}: {}", sku, e);
                continue;
            }
        };

        for batch in generate_batches(&product.id, seed) {
            match db.batches().receive(&ctx, batch).await {
                Ok(_) => batches += 1,
                Err(e) => eprintln!("Failed to receive batch for {}: {}", sku, e),
            }
        }

        product_ids.push(product.id);

        if product_ids.len() % 100 == 0 {
            println!("  Generated {} products...", product_ids.len());
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!(
        "✓ Generated {} products and {} batches in {:?}",
        product_ids.len(),
        batches,
        elapsed
    );

    // A few checkouts so reports are not empty
    let mut sales = 0;
    for (n, product_id) in product_ids.iter().take(10).enumerate() {
        let product = db.products().require_active(&ctx, product_id).await?;
        let quantity = (n % 3 + 1) as i64;
        let allocation = match db
            .allocation()
            .allocate(&ctx, product_id, quantity, AllocationMode::Auto, None)
            .await
        {
            Ok(a) => a,
            Err(e) => {
                eprintln!("Skipping sale of {}: {}", product.sku, e);
                continue;
            }
        };

        let mut cart = Cart::new();
        cart.add_allocated(&product, &allocation, quantity)?;
        let method = [PaymentMethod::Cash, PaymentMethod::Card, PaymentMethod::Upi][n % 3];
        db.settlement()
            .complete_sale(&ctx, &cart, CustomerInfo::default(), method)
            .await?;
        sales += 1;
    }
    println!("✓ Settled {} sales", sales);

    println!();
    let low = db.alerts().low_stock_batches(&ctx).await?;
    let expiry = db.alerts().expiry_alerts(&ctx, None).await?;
    println!("  Low-stock batches: {}", low.len());
    println!("  Expired batches:   {}", expiry.expired.len());
    println!("  Expiring soon:     {}", expiry.expiring_soon.len());

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,medistock=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .init();
}

/// Generates a product with plausible pharmacy data.
fn generate_product(seed: usize) -> NewProduct {
    let (stem, name, hsn) = MEDICINES[seed % MEDICINES.len()];
    let (strength, price_addon) = STRENGTHS[(seed / MEDICINES.len()) % STRENGTHS.len()];

    // ₹9.99 - ₹49.99 plus strength add-on
    let price_cents = 999 + ((seed * 37) % 4000) as i64 + price_addon;

    NewProduct {
        sku: format!("{}-{}-{:04}", stem, strength.trim_end_matches("mg"), seed),
        name: format!("{} {}", name, strength),
        barcode: Some(format!("890{:010}", seed)),
        hsn_code: Some(hsn.to_string()),
        price_cents,
        mrp_cents: Some(price_cents + price_cents / 10),
        tax_rate_bps: TAX_RATES[seed % TAX_RATES.len()],
        min_stock_level: 20,
        min_batch_stock_level: if seed % 4 == 0 { Some(10) } else { None },
        opening_stock: 0,
    }
}

/// Generates the batches received for a product.
fn generate_batches(product_id: &str, seed: usize) -> Vec<NewBatch> {
    let today = Utc::now().date_naive();
    let batch = |suffix: &str, days: i64, quantity: i64| NewBatch {
        product_id: product_id.to_string(),
        batch_number: format!("LOT{:05}-{}", seed, suffix),
        manufacturing_date: Some(today - Duration::days(365)),
        expiry_date: today + Duration::days(days),
        purchase_price_cents: 500 + (seed % 500) as i64,
        quantity,
    };

    let mut batches = vec![batch("A", 180 + (seed % 200) as i64, 40 + (seed % 60) as i64)];

    if seed % 7 == 0 {
        batches.push(batch("X", -((seed % 20) as i64) - 1, 12));
    }
    if seed % 3 == 0 {
        batches.push(batch("S", 5 + (seed % 25) as i64, 25));
    }
    if seed % 5 == 0 {
        batches.push(batch("L", 90, 3));
    }

    batches
}
