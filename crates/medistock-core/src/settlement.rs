//! # Settlement Arithmetic
//!
//! Line and sale amounts, checkout preconditions and sales summaries.
//!
//! ```text
//! per line:  line_total = unit_price × quantity
//!            line_tax   = round_half_up(line_total × bps / 10000)
//!
//! per sale:  subtotal = Σ line_total
//!            tax      = Σ line_tax
//!            total    = subtotal + tax
//! ```
//!
//! Tax is rounded per line, then summed. The sale row always agrees with the
//! sum of its items.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::{Cart, CartLine};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{PaymentMethod, TaxRate};
use crate::validation::{validate_price_cents, validate_quantity, validate_tax_rate_bps};
use crate::MAX_CART_ITEMS;

// =============================================================================
// Line and Sale Amounts
// =============================================================================

/// Computed amounts of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineAmounts {
    pub line_total_cents: i64,
    pub tax_cents: i64,
}

impl LineAmounts {
    /// Fails with `OutOfRange` when the line total does not fit in `i64`.
    pub fn compute(unit_price: Money, quantity: i64, rate: TaxRate) -> CoreResult<Self> {
        let line_total = unit_price
            .checked_multiply_quantity(quantity)
            .ok_or_else(|| amount_overflow("line_total"))?;
        Ok(LineAmounts {
            line_total_cents: line_total.cents(),
            tax_cents: line_total.calculate_tax(rate).cents(),
        })
    }
}

/// Header amounts of a sale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleTotals {
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

impl SaleTotals {
    pub fn from_lines(lines: &[CartLine]) -> CoreResult<Self> {
        let mut subtotal = Money::zero();
        let mut tax = Money::zero();
        for line in lines {
            let a = line.amounts()?;
            subtotal = subtotal
                .checked_add(Money::from_cents(a.line_total_cents))
                .ok_or_else(|| amount_overflow("subtotal"))?;
            tax = tax
                .checked_add(Money::from_cents(a.tax_cents))
                .ok_or_else(|| amount_overflow("tax"))?;
        }
        let total = subtotal
            .checked_add(tax)
            .ok_or_else(|| amount_overflow("total"))?;

        Ok(SaleTotals {
            subtotal_cents: subtotal.cents(),
            tax_cents: tax.cents(),
            total_cents: total.cents(),
        })
    }
}

fn amount_overflow(field: &str) -> CoreError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    }
    .into()
}

// =============================================================================
// Checkout Preconditions
// =============================================================================

/// Checks the cart-only preconditions of checkout. No I/O.
///
/// ## Rules
/// - At least one line, at most 100
/// - Each quantity in 1..=999
/// - Non-negative unit price, tax rate within 0-100%
/// - Product id present on every line
pub fn validate_checkout(cart: &Cart) -> CoreResult<()> {
    if cart.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    if cart.line_count() > MAX_CART_ITEMS {
        return Err(CoreError::CartTooLarge {
            max: MAX_CART_ITEMS,
        });
    }

    for line in &cart.lines {
        if line.product_id.trim().is_empty() {
            return Err(ValidationError::required("product_id").into());
        }
        validate_quantity(line.quantity)?;
        validate_price_cents(line.unit_price_cents)?;
        validate_tax_rate_bps(line.tax_rate_bps)?;
    }

    Ok(())
}

// =============================================================================
// Sales Summary
// =============================================================================

/// Totals of one payment method within a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodTotal {
    pub payment_method: PaymentMethod,
    pub sale_count: i64,
    pub total_cents: i64,
}

/// Aggregated sales for an inclusive date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    #[ts(as = "String")]
    pub from_date: NaiveDate,
    #[ts(as = "String")]
    pub to_date: NaiveDate,
    pub sale_count: i64,
    pub units_sold: i64,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub by_payment_method: Vec<PaymentMethodTotal>,
}

impl SalesSummary {
    pub fn empty(from_date: NaiveDate, to_date: NaiveDate) -> Self {
        SalesSummary {
            from_date,
            to_date,
            sale_count: 0,
            units_sold: 0,
            subtotal_cents: 0,
            tax_cents: 0,
            total_cents: 0,
            by_payment_method: Vec::new(),
        }
    }

    /// Folds one settled sale into the summary.
    pub fn record(&mut self, method: PaymentMethod, totals: SaleTotals, units: i64) {
        self.sale_count += 1;
        self.units_sold += units;
        self.subtotal_cents += totals.subtotal_cents;
        self.tax_cents += totals.tax_cents;
        self.total_cents += totals.total_cents;

        match self
            .by_payment_method
            .iter_mut()
            .find(|m| m.payment_method == method)
        {
            Some(entry) => {
                entry.sale_count += 1;
                entry.total_cents += totals.total_cents;
            }
            None => self.by_payment_method.push(PaymentMethodTotal {
                payment_method: method,
                sale_count: 1,
                total_cents: totals.total_cents,
            }),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MAX_ITEM_QUANTITY, MAX_PRICE_CENTS};

    fn line(price: i64, qty: i64, bps: u32) -> CartLine {
        CartLine {
            product_id: "p-1".to_string(),
            batch_id: Some("b-1".to_string()),
            sku: "SKU-1".to_string(),
            name: "Cetirizine 10mg".to_string(),
            hsn_code: None,
            batch_number: Some("LOT-1".to_string()),
            expiry_date: None,
            unit_price_cents: price,
            tax_rate_bps: bps,
            quantity: qty,
            available_qty: None,
        }
    }

    #[test]
    fn test_line_amounts_round_half_up() {
        // 2 × 10.00 at 8.25% = 1.65 exactly
        let a = LineAmounts::compute(Money::from_cents(1000), 2, TaxRate::from_bps(825)).unwrap();
        assert_eq!(a.line_total_cents, 2000);
        assert_eq!(a.tax_cents, 165);

        // 1 × 10.00 at 8.25% = 0.825 → 0.83
        let a = LineAmounts::compute(Money::from_cents(1000), 1, TaxRate::from_bps(825)).unwrap();
        assert_eq!(a.tax_cents, 83);
    }

    #[test]
    fn test_oversized_amounts_are_rejected() {
        let err = LineAmounts::compute(Money::from_cents(i64::MAX / 2), 3, TaxRate::from_bps(1200))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { ref field, .. }) if field == "line_total"
        ));

        // Each line fits; their sum does not
        let lines: Vec<CartLine> = (0..5).map(|_| line(i64::MAX / 4, 1, 0)).collect();
        assert!(SaleTotals::from_lines(&lines).is_err());

        // Priced at the ceiling, a full cart still fits
        let full: Vec<CartLine> = (0..MAX_CART_ITEMS)
            .map(|_| line(MAX_PRICE_CENTS, MAX_ITEM_QUANTITY, 10000))
            .collect();
        let totals = SaleTotals::from_lines(&full).unwrap();
        assert_eq!(totals.total_cents, 2 * totals.subtotal_cents);
    }

    #[test]
    fn test_totals_sum_lines() {
        let totals =
            SaleTotals::from_lines(&[line(1000, 1, 825), line(1000, 1, 825), line(250, 4, 0)]).unwrap();
        assert_eq!(totals.subtotal_cents, 3000);
        assert_eq!(totals.tax_cents, 166);
        assert_eq!(totals.total_cents, 3166);
    }

    #[test]
    fn test_validate_checkout() {
        assert!(matches!(
            validate_checkout(&Cart::new()),
            Err(CoreError::EmptyCart)
        ));

        let ok = Cart {
            lines: vec![line(1000, 1, 1200)],
        };
        assert!(validate_checkout(&ok).is_ok());

        let bad_qty = Cart {
            lines: vec![line(1000, 0, 1200)],
        };
        assert!(matches!(
            validate_checkout(&bad_qty),
            Err(CoreError::Validation(_))
        ));

        let bad_price = Cart {
            lines: vec![line(-1, 1, 1200)],
        };
        assert!(validate_checkout(&bad_price).is_err());

        let over_ceiling = Cart {
            lines: vec![line(MAX_PRICE_CENTS + 1, 1, 1200)],
        };
        assert!(validate_checkout(&over_ceiling).is_err());
    }

    #[test]
    fn test_summary_groups_by_payment_method() {
        let d = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let mut summary = SalesSummary::empty(d, d);
        let t = SaleTotals {
            subtotal_cents: 1000,
            tax_cents: 120,
            total_cents: 1120,
        };
        summary.record(PaymentMethod::Cash, t, 2);
        summary.record(PaymentMethod::Upi, t, 1);
        summary.record(PaymentMethod::Cash, t, 3);

        assert_eq!(summary.sale_count, 3);
        assert_eq!(summary.units_sold, 6);
        assert_eq!(summary.total_cents, 3360);
        assert_eq!(summary.by_payment_method.len(), 2);
        assert_eq!(summary.by_payment_method[0].sale_count, 2);
        assert_eq!(summary.by_payment_method[0].total_cents, 2240);
    }
}
