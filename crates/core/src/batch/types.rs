//! Batch domain types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Batch status in the count lifecycle.
///
/// Only two states carry meaning: a batch is either open for entry and
/// attestation, or finalized and permanently read-only. The database enum
/// also carries a legacy `closed` value with no transitions; it is folded
/// into `Open` at this boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// Batch accepts donation mutations and attestation steps.
    Open,
    /// Batch is closed as financial fact (immutable).
    Finalized,
}

impl BatchStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Finalized => "finalized",
        }
    }

    /// Parses a status from a string.
    ///
    /// The legacy `closed` value is folded into `Open`; it exists in old
    /// rows but has no transitions in or out of the attestation flow.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "open" | "closed" => Some(Self::Open),
            "finalized" => Some(Self::Finalized),
            _ => None,
        }
    }

    /// Returns true if the batch and its donations are immutable.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        matches!(self, Self::Finalized)
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cash/check partition of a batch's donation set.
///
/// Invariant (pre-finalization): `cash_total + check_total` equals the
/// batch's cached `total_amount`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPartition {
    /// Sum of cash donation amounts.
    pub cash_total: Decimal,
    /// Sum of check donation amounts.
    pub check_total: Decimal,
}

impl BatchPartition {
    /// Returns the combined total of both partitions.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.cash_total + self.check_total
    }
}

/// Derives a batch display name from the service name and date.
#[must_use]
pub fn display_name(service_name: &str, date: NaiveDate) -> String {
    format!("{service_name} — {date}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_as_str() {
        assert_eq!(BatchStatus::Open.as_str(), "open");
        assert_eq!(BatchStatus::Finalized.as_str(), "finalized");
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(BatchStatus::parse("open"), Some(BatchStatus::Open));
        assert_eq!(BatchStatus::parse("OPEN"), Some(BatchStatus::Open));
        assert_eq!(BatchStatus::parse("finalized"), Some(BatchStatus::Finalized));
        assert_eq!(BatchStatus::parse("invalid"), None);
    }

    #[test]
    fn test_legacy_closed_folds_into_open() {
        assert_eq!(BatchStatus::parse("closed"), Some(BatchStatus::Open));
    }

    #[test]
    fn test_status_locked() {
        assert!(!BatchStatus::Open.is_locked());
        assert!(BatchStatus::Finalized.is_locked());
    }

    #[test]
    fn test_partition_total() {
        let partition = BatchPartition {
            cash_total: dec!(125.00),
            check_total: dec!(120.00),
        };
        assert_eq!(partition.total(), dec!(245.00));
    }

    #[test]
    fn test_display_name() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        assert_eq!(
            display_name("Sunday Morning", date),
            "Sunday Morning — 2026-08-30"
        );
    }
}
