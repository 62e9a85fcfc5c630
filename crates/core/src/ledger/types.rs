//! Donation domain types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// How a donation was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationType {
    /// Loose or enveloped cash.
    Cash,
    /// A check; carries a check number.
    Check,
}

impl DonationType {
    /// Returns the string representation of the type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Check => "check",
        }
    }

    /// Parses a donation type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cash" => Some(Self::Cash),
            "check" => Some(Self::Check),
            _ => None,
        }
    }
}

impl fmt::Display for DonationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The slice of a donation the totals calculations care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DonationLine {
    /// Cash or check.
    pub donation_type: DonationType,
    /// Donation amount (2-decimal precision).
    pub amount: Decimal,
}

/// Input for creating or updating a donation.
#[derive(Debug, Clone)]
pub struct DonationInput {
    /// Date the donation was received.
    pub donation_date: NaiveDate,
    /// Donation amount, must be > 0.
    pub amount: Decimal,
    /// Cash or check.
    pub donation_type: DonationType,
    /// Check number, required iff `donation_type` is check.
    pub check_number: Option<String>,
    /// Known contributor, None for anonymous/visitor donations.
    pub member_id: Option<Uuid>,
    /// Free-text notes.
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_donation_type_as_str() {
        assert_eq!(DonationType::Cash.as_str(), "cash");
        assert_eq!(DonationType::Check.as_str(), "check");
    }

    #[test]
    fn test_donation_type_parse() {
        assert_eq!(DonationType::parse("cash"), Some(DonationType::Cash));
        assert_eq!(DonationType::parse("CHECK"), Some(DonationType::Check));
        assert_eq!(DonationType::parse("card"), None);
    }

    #[test]
    fn test_donation_type_display() {
        assert_eq!(format!("{}", DonationType::Cash), "cash");
        assert_eq!(format!("{}", DonationType::Check), "check");
    }
}
