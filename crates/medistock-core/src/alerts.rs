//! # Alert Rules
//!
//! Expiry classification and low-stock thresholds. The alert service fetches
//! candidate batches; these rules decide which bucket each one lands in.
//!
//! ```text
//!        expired            expiring soon                 ok
//! ──────────────────┼──────────────────────────┼──────────────────►
//!                 today                   today + horizon        expiry
//!   (expiry <= today)     (today < expiry <= today + horizon)
//! ```

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Where a batch's expiry falls relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExpiryStatus {
    Expired { days_past: i64 },
    ExpiringSoon { days_remaining: i64 },
    Ok,
}

/// Classifies an expiry date. A batch expiring today is already expired.
pub fn classify_expiry(expiry_date: NaiveDate, today: NaiveDate, horizon_days: i64) -> ExpiryStatus {
    let days = (expiry_date - today).num_days();
    if days <= 0 {
        ExpiryStatus::Expired { days_past: -days }
    } else if days <= horizon_days {
        ExpiryStatus::ExpiringSoon {
            days_remaining: days,
        }
    } else {
        ExpiryStatus::Ok
    }
}

/// Last expiry date that still raises an alert.
pub fn alert_cutoff(today: NaiveDate, horizon_days: i64) -> NaiveDate {
    today + Duration::days(horizon_days.max(0))
}

/// A batch at or under its threshold, but not empty.
pub fn is_low_batch(remaining_quantity: i64, threshold: i64) -> bool {
    remaining_quantity > 0 && remaining_quantity <= threshold
}

/// A batch surfaced by an alert query, joined with its product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BatchAlert {
    pub batch_id: String,
    pub product_id: String,
    pub sku: String,
    pub product_name: String,
    pub batch_number: String,
    #[ts(as = "String")]
    pub expiry_date: NaiveDate,
    pub remaining_quantity: i64,
    /// Effective per-batch threshold (product setting or default).
    pub threshold: i64,
}

/// A batch alert with its expiry classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryAlert {
    #[serde(flatten)]
    #[ts(flatten)]
    pub batch: BatchAlert,
    pub status: ExpiryStatus,
}

/// Expiry alerts split into the two actionable buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryAlerts {
    pub expired: Vec<ExpiryAlert>,
    pub expiring_soon: Vec<ExpiryAlert>,
}

impl ExpiryAlerts {
    /// Buckets candidates by [`classify_expiry`]; batches outside the
    /// horizon are dropped.
    pub fn partition(
        candidates: impl IntoIterator<Item = BatchAlert>,
        today: NaiveDate,
        horizon_days: i64,
    ) -> Self {
        let mut alerts = ExpiryAlerts::default();
        for batch in candidates {
            let status = classify_expiry(batch.expiry_date, today, horizon_days);
            match status {
                ExpiryStatus::Expired { .. } => alerts.expired.push(ExpiryAlert { batch, status }),
                ExpiryStatus::ExpiringSoon { .. } => {
                    alerts.expiring_soon.push(ExpiryAlert { batch, status })
                }
                ExpiryStatus::Ok => {}
            }
        }
        alerts
    }

    pub fn is_empty(&self) -> bool {
        self.expired.is_empty() && self.expiring_soon.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn alert(id: &str, days: i64) -> BatchAlert {
        BatchAlert {
            batch_id: id.to_string(),
            product_id: "p-1".to_string(),
            sku: "AMOX-250".to_string(),
            product_name: "Amoxicillin 250mg".to_string(),
            batch_number: format!("LOT-{}", id),
            expiry_date: today() + Duration::days(days),
            remaining_quantity: 10,
            threshold: 5,
        }
    }

    #[test]
    fn test_classify_expiry() {
        assert_eq!(
            classify_expiry(today(), today(), 30),
            ExpiryStatus::Expired { days_past: 0 }
        );
        assert_eq!(
            classify_expiry(today() - Duration::days(3), today(), 30),
            ExpiryStatus::Expired { days_past: 3 }
        );
        assert_eq!(
            classify_expiry(today() + Duration::days(30), today(), 30),
            ExpiryStatus::ExpiringSoon { days_remaining: 30 }
        );
        assert_eq!(
            classify_expiry(today() + Duration::days(31), today(), 30),
            ExpiryStatus::Ok
        );
    }

    #[test]
    fn test_low_batch_threshold() {
        assert!(is_low_batch(5, 5));
        assert!(is_low_batch(1, 5));
        assert!(!is_low_batch(0, 5));
        assert!(!is_low_batch(6, 5));
    }

    #[test]
    fn test_partition() {
        let alerts = ExpiryAlerts::partition(
            vec![alert("a", -2), alert("b", 0), alert("c", 12), alert("d", 90)],
            today(),
            30,
        );
        assert_eq!(alerts.expired.len(), 2);
        assert_eq!(alerts.expiring_soon.len(), 1);
        assert_eq!(alerts.expiring_soon[0].batch.batch_id, "c");
    }

    #[test]
    fn test_alert_cutoff() {
        assert_eq!(alert_cutoff(today(), 30), today() + Duration::days(30));
        assert_eq!(alert_cutoff(today(), -5), today());
    }
}
