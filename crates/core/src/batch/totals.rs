//! Batch total recomputation and partition.
//!
//! Totals are always recomputed as a pure sum over the donation set, never
//! maintained as running counters, so recomputation is idempotent and
//! order-independent.

use rust_decimal::Decimal;

use super::types::BatchPartition;
use crate::ledger::types::{DonationLine, DonationType};

/// Stateless calculator for batch totals.
pub struct BatchTotals;

impl BatchTotals {
    /// Recomputes the cached total from the full donation set.
    ///
    /// An empty set yields zero, not an error.
    #[must_use]
    pub fn recompute_total(lines: &[DonationLine]) -> Decimal {
        lines.iter().map(|l| l.amount).sum()
    }

    /// Partitions the donation set into cash and check totals.
    #[must_use]
    pub fn partition(lines: &[DonationLine]) -> BatchPartition {
        let mut partition = BatchPartition::default();
        for line in lines {
            match line.donation_type {
                DonationType::Cash => partition.cash_total += line.amount,
                DonationType::Check => partition.check_total += line.amount,
            }
        }
        partition
    }
}
