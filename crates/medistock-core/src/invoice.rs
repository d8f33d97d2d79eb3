//! # Invoice Numbers
//!
//! `INV-<millis>` numbers that never repeat within a process, even when two
//! sales land in the same millisecond or the wall clock steps backwards.
//!
//! Uniqueness across processes is enforced by the `UNIQUE (tenant_id,
//! invoice_number)` constraint; the settlement service draws a fresh number
//! and retries when it trips.

use std::sync::atomic::{AtomicI64, Ordering};

use crate::DEFAULT_INVOICE_PREFIX;

/// Monotonic invoice number source.
#[derive(Debug)]
pub struct InvoiceSequence {
    prefix: String,
    last: AtomicI64,
}

impl InvoiceSequence {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::starting_at(prefix, 0)
    }

    /// Sequence whose next number is at least `last_millis + 1`.
    pub fn starting_at(prefix: impl Into<String>, last_millis: i64) -> Self {
        InvoiceSequence {
            prefix: prefix.into(),
            last: AtomicI64::new(last_millis),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Next number given the current time in milliseconds.
    pub fn next_at(&self, now_millis: i64) -> String {
        let mut current = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now_millis.max(current + 1);
            match self.last.compare_exchange_weak(
                current,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return format!("{}-{}", self.prefix, candidate),
                Err(observed) => current = observed,
            }
        }
    }

    /// Next number for the current wall clock.
    pub fn next(&self) -> String {
        self.next_at(chrono::Utc::now().timestamp_millis())
    }
}

impl Default for InvoiceSequence {
    fn default() -> Self {
        Self::new(DEFAULT_INVOICE_PREFIX)
    }
}
