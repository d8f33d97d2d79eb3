//! # Cart
//!
//! A checkout cart whose lines are bound to the batch they will draw from.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  allocate(P, qty) ─────► add_allocated() ──► merge on (product, batch) │
//! │                                                                         │
//! │  product w/o batches ──► add_unbatched() ──► merge on (product, None)  │
//! │                                                                         │
//! │  change quantity ──────► update_quantity() ─► 0 removes the line       │
//! │                                                                         │
//! │  checkout ─────────────► complete_sale(cart) (medistock-db)            │
//! │                           cart is never modified by checkout            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `available_qty` is the batch stock seen at allocation time. It caps what
//! the cart accepts but guarantees nothing; checkout re-checks the ledger.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::allocation::BatchAllocation;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::settlement::{LineAmounts, SaleTotals};
use crate::types::{Product, TaxRate};
use crate::validation::validate_quantity;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// A cart line.
///
/// Product and batch details are frozen when the line is added so the cart
/// renders consistently even if the catalog changes before checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: String,
    /// `None` only for products sold without batch tracking.
    pub batch_id: Option<String>,
    pub sku: String,
    pub name: String,
    pub hsn_code: Option<String>,
    pub batch_number: Option<String>,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
    pub unit_price_cents: i64,
    pub tax_rate_bps: u32,
    pub quantity: i64,
    pub available_qty: Option<i64>,
}

impl CartLine {
    /// Line drawing from the allocated batch.
    pub fn from_allocation(product: &Product, allocation: &BatchAllocation, quantity: i64) -> Self {
        CartLine {
            product_id: product.id.clone(),
            batch_id: Some(allocation.batch_id.clone()),
            sku: product.sku.clone(),
            name: product.name.clone(),
            hsn_code: product.hsn_code.clone(),
            batch_number: Some(allocation.batch_number.clone()),
            expiry_date: Some(allocation.expiry_date),
            unit_price_cents: product.price_cents,
            tax_rate_bps: product.tax_rate_bps,
            quantity,
            available_qty: Some(allocation.available_qty),
        }
    }

    /// Line for a product without batch tracking.
    pub fn unbatched(product: &Product, quantity: i64) -> Self {
        CartLine {
            product_id: product.id.clone(),
            batch_id: None,
            sku: product.sku.clone(),
            name: product.name.clone(),
            hsn_code: product.hsn_code.clone(),
            batch_number: None,
            expiry_date: None,
            unit_price_cents: product.price_cents,
            tax_rate_bps: product.tax_rate_bps,
            quantity,
            available_qty: Some(product.stock_quantity),
        }
    }

    pub fn amounts(&self) -> CoreResult<LineAmounts> {
        LineAmounts::compute(
            Money::from_cents(self.unit_price_cents),
            self.quantity,
            TaxRate::from_bps(self.tax_rate_bps),
        )
    }

    fn matches(&self, product_id: &str, batch_id: Option<&str>) -> bool {
        self.product_id == product_id && self.batch_id.as_deref() == batch_id
    }

    fn check_quantity(&self, quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity)?;
        match self.available_qty {
            Some(available) if quantity > available => match &self.batch_number {
                Some(batch_number) => Err(CoreError::InsufficientBatchStock {
                    batch_number: batch_number.clone(),
                    available,
                    requested: quantity,
                }),
                None => Err(CoreError::InsufficientStock {
                    sku: self.sku.clone(),
                    available,
                    requested: quantity,
                }),
            },
            _ => Ok(()),
        }
    }
}

/// The cart handed to checkout.
///
/// ## Invariants
/// - Lines are unique by `(product_id, batch_id)`
/// - Quantity per line is 1..=999 and within the allocation's available qty
/// - At most 100 lines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Cart::default()
    }

    /// Adds an allocated line, merging with an existing line on the same batch.
    pub fn add_allocated(
        &mut self,
        product: &Product,
        allocation: &BatchAllocation,
        quantity: i64,
    ) -> CoreResult<()> {
        self.add_line(CartLine::from_allocation(product, allocation, quantity))
    }

    /// Adds a line for a product without batch tracking.
    pub fn add_unbatched(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        self.add_line(CartLine::unbatched(product, quantity))
    }

    fn add_line(&mut self, line: CartLine) -> CoreResult<()> {
        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|l| l.matches(&line.product_id, line.batch_id.as_deref()))
        {
            let merged = existing.quantity + line.quantity;
            // Fresher availability wins
            let mut candidate = line;
            candidate.quantity = merged;
            candidate.check_quantity(merged)?;
            *existing = candidate;
            return Ok(());
        }

        if self.lines.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        line.check_quantity(line.quantity)?;
        self.lines.push(line);
        Ok(())
    }

    /// Sets the quantity of a line; zero removes it.
    pub fn update_quantity(
        &mut self,
        product_id: &str,
        batch_id: Option<&str>,
        quantity: i64,
    ) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_line(product_id, batch_id);
        }

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.matches(product_id, batch_id))
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
        line.check_quantity(quantity)?;
        line.quantity = quantity;
        Ok(())
    }

    pub fn remove_line(&mut self, product_id: &str, batch_id: Option<&str>) -> CoreResult<()> {
        let before = self.lines.len();
        self.lines.retain(|l| !l.matches(product_id, batch_id));
        if self.lines.len() == before {
            return Err(CoreError::ProductNotFound(product_id.to_string()));
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Total units across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn totals(&self) -> CoreResult<SaleTotals> {
        SaleTotals::from_lines(&self.lines)
    }
}
