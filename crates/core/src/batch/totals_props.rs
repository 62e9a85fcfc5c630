//! Property-based tests for batch totals.
//!
//! Validates the total-consistency property: for any donation set,
//! `cash_total + check_total == recomputed total == sum of amounts`,
//! regardless of ordering.

use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::batch::totals::BatchTotals;
use crate::ledger::types::{DonationLine, DonationType};

/// Strategy for generating positive 2-decimal amounts.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

/// Strategy for generating a donation line.
fn arb_line() -> impl Strategy<Value = DonationLine> {
    (arb_amount(), prop::bool::ANY).prop_map(|(amount, is_cash)| DonationLine {
        donation_type: if is_cash {
            DonationType::Cash
        } else {
            DonationType::Check
        },
        amount,
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// cash + check always equals the recomputed total.
    #[test]
    fn prop_partition_sums_to_total(lines in prop::collection::vec(arb_line(), 0..50)) {
        let total = BatchTotals::recompute_total(&lines);
        let partition = BatchTotals::partition(&lines);
        prop_assert_eq!(partition.total(), total);
    }

    /// The recomputed total equals the plain sum of amounts.
    #[test]
    fn prop_total_is_plain_sum(lines in prop::collection::vec(arb_line(), 0..50)) {
        let expected: Decimal = lines.iter().map(|l| l.amount).sum();
        prop_assert_eq!(BatchTotals::recompute_total(&lines), expected);
    }

    /// Recomputation is order-independent.
    #[test]
    fn prop_total_order_independent(lines in prop::collection::vec(arb_line(), 0..50)) {
        let mut shuffled = lines.clone();
        shuffled.reverse();
        prop_assert_eq!(
            BatchTotals::recompute_total(&lines),
            BatchTotals::recompute_total(&shuffled)
        );
        prop_assert_eq!(BatchTotals::partition(&lines), BatchTotals::partition(&shuffled));
    }

    /// Every generated line is positive, so a non-empty set has a positive total.
    #[test]
    fn prop_non_empty_set_positive_total(lines in prop::collection::vec(arb_line(), 1..50)) {
        prop_assert!(BatchTotals::recompute_total(&lines) > Decimal::ZERO);
    }
}
