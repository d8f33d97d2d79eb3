//! # Batch Allocation
//!
//! FIFO-by-expiry batch selection over an already fetched batch list.
//!
//! ## Selection Flow
//! ```text
//! batches of product (from the ledger)
//!      │
//!      ▼
//! eligible(): is_active AND remaining > 0 AND expiry > today
//!             sorted by (expiry_date, created_at)
//!      │
//!      ├── empty ──────────────► NoEligibleBatches
//!      │
//!      ├── Auto ──► first batch
//!      │              └── remaining < qty ──► InsufficientBatchStock
//!      │
//!      └── Manual(batch_id) ──► must be in eligible list
//!                     ├── missing ──► BatchNotEligible
//!                     └── remaining < qty ──► InsufficientBatchStock
//! ```
//!
//! Nothing here reserves stock. The settlement transaction re-checks every
//! batch with a conditional write, so an allocation is advisory.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::Batch;
use crate::validation::validate_quantity;
use crate::DEFAULT_EXPIRY_WARNING_DAYS;

// =============================================================================
// Types
// =============================================================================

/// How the batch for a request is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AllocationMode {
    /// Nearest-expiry eligible batch.
    #[default]
    Auto,
    /// Caller names the batch from the eligible list.
    Manual,
}

/// Advisory attached to an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AllocationWarning {
    ExpiringSoon { days_remaining: i64 },
}

/// A batch chosen (or offered) for a product request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BatchAllocation {
    pub batch_id: String,
    pub batch_number: String,
    #[ts(as = "String")]
    pub expiry_date: NaiveDate,
    pub available_qty: i64,
    pub warning: Option<AllocationWarning>,
}

/// One leg of a FIFO split: take `quantity` units from `allocation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SplitAllocation {
    pub allocation: BatchAllocation,
    pub quantity: i64,
}

// =============================================================================
// Policy
// =============================================================================

/// FIFO-by-expiry allocation rules evaluated against a fixed `today`.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use medistock_core::allocation::AllocationPolicy;
///
/// let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
/// let policy = AllocationPolicy::new(today, 30);
/// let soon = NaiveDate::from_ymd_opt(2026, 3, 11).unwrap();
/// assert!(policy.warning_for(soon).is_some());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationPolicy {
    today: NaiveDate,
    warning_days: i64,
}

impl AllocationPolicy {
    pub fn new(today: NaiveDate, warning_days: i64) -> Self {
        AllocationPolicy {
            today,
            warning_days: warning_days.max(0),
        }
    }

    /// Policy with the default 30 day warning horizon.
    pub fn with_default_horizon(today: NaiveDate) -> Self {
        Self::new(today, DEFAULT_EXPIRY_WARNING_DAYS)
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Filters to sellable batches and orders them FIFO by expiry.
    ///
    /// Ties on expiry go to the batch received first.
    pub fn eligible(&self, batches: impl IntoIterator<Item = Batch>) -> Vec<Batch> {
        let mut eligible: Vec<Batch> = batches
            .into_iter()
            .filter(|b| b.is_sellable_on(self.today))
            .collect();
        eligible.sort_by(|a, b| {
            a.expiry_date
                .cmp(&b.expiry_date)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        eligible
    }

    /// `ExpiringSoon` when expiry falls within the warning horizon.
    pub fn warning_for(&self, expiry_date: NaiveDate) -> Option<AllocationWarning> {
        let days_remaining = (expiry_date - self.today).num_days();
        (days_remaining > 0 && days_remaining <= self.warning_days)
            .then_some(AllocationWarning::ExpiringSoon { days_remaining })
    }

    /// Describes an eligible batch as an allocation candidate.
    pub fn describe(&self, batch: &Batch) -> BatchAllocation {
        BatchAllocation {
            batch_id: batch.id.clone(),
            batch_number: batch.batch_number.clone(),
            expiry_date: batch.expiry_date,
            available_qty: batch.remaining_quantity,
            warning: self.warning_for(batch.expiry_date),
        }
    }

    /// Picks the batch for `quantity` units of `product_id`.
    ///
    /// `eligible` must be the output of [`AllocationPolicy::eligible`].
    pub fn select(
        &self,
        product_id: &str,
        eligible: &[Batch],
        quantity: i64,
        mode: AllocationMode,
        batch_id: Option<&str>,
    ) -> CoreResult<BatchAllocation> {
        validate_quantity(quantity)?;

        let chosen = match (mode, batch_id) {
            (AllocationMode::Auto, Some(_)) => {
                return Err(ValidationError::NotAllowed {
                    field: "batch_id".to_string(),
                    reason: "automatic allocation picks the batch itself".to_string(),
                }
                .into())
            }
            (AllocationMode::Manual, None) => {
                return Err(ValidationError::required("batch_id").into());
            }
            (AllocationMode::Auto, None) => {
                eligible
                    .first()
                    .ok_or_else(|| CoreError::NoEligibleBatches {
                        product_id: product_id.to_string(),
                    })?
            }
            (AllocationMode::Manual, Some(batch_id)) => {
                if eligible.is_empty() {
                    return Err(CoreError::NoEligibleBatches {
                        product_id: product_id.to_string(),
                    });
                }
                eligible
                    .iter()
                    .find(|b| b.id == batch_id)
                    .ok_or_else(|| CoreError::BatchNotEligible {
                        batch_id: batch_id.to_string(),
                    })?
            }
        };

        if chosen.remaining_quantity < quantity {
            return Err(CoreError::InsufficientBatchStock {
                batch_number: chosen.batch_number.clone(),
                available: chosen.remaining_quantity,
                requested: quantity,
            });
        }

        Ok(self.describe(chosen))
    }

    /// Walks eligible batches in FIFO order until `quantity` is covered.
    ///
    /// Unlike [`AllocationPolicy::select`], the quantity is not capped at
    /// the per-line maximum; each returned leg becomes its own cart line.
    pub fn plan_fifo_split(
        &self,
        product_id: &str,
        sku: &str,
        eligible: &[Batch],
        quantity: i64,
    ) -> CoreResult<Vec<SplitAllocation>> {
        if quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }

        if eligible.is_empty() {
            return Err(CoreError::NoEligibleBatches {
                product_id: product_id.to_string(),
            });
        }

        let available: i64 = eligible.iter().map(|b| b.remaining_quantity).sum();
        if available < quantity {
            return Err(CoreError::InsufficientStock {
                sku: sku.to_string(),
                available,
                requested: quantity,
            });
        }

        let mut outstanding = quantity;
        let mut legs = Vec::new();
        for batch in eligible {
            if outstanding == 0 {
                break;
            }
            let take = batch.remaining_quantity.min(outstanding);
            outstanding -= take;
            legs.push(SplitAllocation {
                allocation: self.describe(batch),
                quantity: take,
            });
        }

        Ok(legs)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn batch(id: &str, days_to_expiry: i64, remaining: i64) -> Batch {
        let created = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        Batch {
            id: id.to_string(),
            tenant_id: "t-1".to_string(),
            product_id: "p-1".to_string(),
            batch_number: format!("LOT-{}", id),
            manufacturing_date: None,
            expiry_date: today() + Duration::days(days_to_expiry),
            purchase_price_cents: 1000,
            quantity: remaining.max(1),
            remaining_quantity: remaining,
            is_active: true,
            created_at: created,
            updated_at: created,
        }
    }

    fn policy() -> AllocationPolicy {
        AllocationPolicy::with_default_horizon(today())
    }

    #[test]
    fn test_auto_picks_nearest_expiry() {
        let p = policy();
        let eligible = p.eligible(vec![batch("e3", 300, 10), batch("e1", 10, 10), batch("e2", 60, 10)]);
        let ids: Vec<&str> = eligible.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["e1", "e2", "e3"]);

        let alloc = p.select("p-1", &eligible, 5, AllocationMode::Auto, None).unwrap();
        assert_eq!(alloc.batch_id, "e1");
        assert_eq!(alloc.available_qty, 10);
        assert_eq!(
            alloc.warning,
            Some(AllocationWarning::ExpiringSoon { days_remaining: 10 })
        );
    }

    #[test]
    fn test_expired_and_empty_batches_are_excluded() {
        let p = policy();
        let mut retired = batch("retired", 90, 10);
        retired.is_active = false;
        let eligible = p.eligible(vec![
            batch("yesterday", -1, 10),
            batch("today", 0, 10),
            batch("empty", 40, 0),
            retired,
        ]);
        assert!(eligible.is_empty());

        let err = p.select("p-1", &eligible, 1, AllocationMode::Auto, None).unwrap_err();
        assert!(matches!(err, CoreError::NoEligibleBatches { .. }));
    }

    #[test]
    fn test_ties_broken_by_receipt_time() {
        let p = policy();
        let mut later = batch("later", 45, 10);
        later.created_at = later.created_at + Duration::hours(1);
        let earlier = batch("earlier", 45, 10);
        let eligible = p.eligible(vec![later, earlier]);
        assert_eq!(eligible[0].id, "earlier");
    }

    #[test]
    fn test_auto_never_splits() {
        let p = policy();
        let eligible = p.eligible(vec![batch("b1", 10, 3), batch("b2", 60, 30)]);
        let err = p.select("p-1", &eligible, 5, AllocationMode::Auto, None).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientBatchStock { available: 3, requested: 5, .. }
        ));
    }

    #[test]
    fn test_manual_selection() {
        let p = policy();
        let eligible = p.eligible(vec![batch("b1", 10, 20), batch("b2", 60, 30)]);

        let alloc = p
            .select("p-1", &eligible, 25, AllocationMode::Manual, Some("b2"))
            .unwrap();
        assert_eq!(alloc.batch_id, "b2");
        assert_eq!(alloc.warning, None);

        let err = p
            .select("p-1", &eligible, 1, AllocationMode::Manual, Some("expired"))
            .unwrap_err();
        assert!(matches!(err, CoreError::BatchNotEligible { .. }));

        let err = p
            .select("p-1", &eligible, 1, AllocationMode::Manual, None)
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_auto_rejects_explicit_batch() {
        let p = policy();
        let eligible = p.eligible(vec![batch("b1", 10, 20)]);
        let err = p
            .select("p-1", &eligible, 1, AllocationMode::Auto, Some("b1"))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::NotAllowed { .. })
        ));
    }

    #[test]
    fn test_quantity_validated_before_selection() {
        let p = policy();
        let err = p.select("p-1", &[], 0, AllocationMode::Auto, None).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_warning_horizon_boundary() {
        let p = AllocationPolicy::new(today(), 30);
        assert!(p.warning_for(today() + Duration::days(30)).is_some());
        assert!(p.warning_for(today() + Duration::days(31)).is_none());
        assert!(p.warning_for(today()).is_none());
    }

    #[test]
    fn test_fifo_split_walks_batches_in_order() {
        let p = policy();
        let eligible = p.eligible(vec![batch("b2", 60, 30), batch("b1", 10, 20)]);

        let legs = p.plan_fifo_split("p-1", "PARA-500", &eligible, 35).unwrap();
        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].allocation.batch_id, "b1");
        assert_eq!(legs[0].quantity, 20);
        assert_eq!(legs[1].allocation.batch_id, "b2");
        assert_eq!(legs[1].quantity, 15);

        let legs = p.plan_fifo_split("p-1", "PARA-500", &eligible, 20).unwrap();
        assert_eq!(legs.len(), 1);
    }

    #[test]
    fn test_fifo_split_insufficient() {
        let p = policy();
        let eligible = p.eligible(vec![batch("b1", 10, 20), batch("b2", 60, 30)]);
        let err = p.plan_fifo_split("p-1", "PARA-500", &eligible, 51).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock { available: 50, requested: 51, .. }
        ));
    }
}
