//! Business rule validation for donation operations.

use rust_decimal::Decimal;
use uuid::Uuid;

use super::error::LedgerError;
use super::types::{DonationInput, DonationType};
use crate::batch::types::BatchStatus;

/// Validates a donation create/update input.
///
/// # Errors
///
/// Returns an error if the amount is not positive or the check number does
/// not match the donation type.
pub fn validate_donation(input: &DonationInput) -> Result<(), LedgerError> {
    if input.amount == Decimal::ZERO {
        return Err(LedgerError::ZeroAmount);
    }
    if input.amount < Decimal::ZERO {
        return Err(LedgerError::NegativeAmount);
    }

    let has_check_number = input
        .check_number
        .as_ref()
        .is_some_and(|n| !n.trim().is_empty());

    match input.donation_type {
        DonationType::Check if !has_check_number => Err(LedgerError::CheckNumberRequired),
        DonationType::Cash if has_check_number => Err(LedgerError::CheckNumberNotAllowed),
        _ => Ok(()),
    }
}

/// Normalizes a check number for storage: a blank value means absent.
///
/// `validate_donation` already treats blank as absent; stored rows must
/// agree with it so the `check_number` table constraint holds.
#[must_use]
pub fn normalize_check_number(value: Option<String>) -> Option<String> {
    value
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

/// Validates that the owning batch still accepts ledger mutations.
///
/// Every mutating ledger call must run this check against the batch's
/// current status, regardless of the caller's role. UI state is not a guard.
///
/// # Errors
///
/// Returns `LedgerError::BatchFinalized` if the batch is finalized.
pub fn validate_batch_open(batch_id: Uuid, status: BatchStatus) -> Result<(), LedgerError> {
    if status.is_locked() {
        return Err(LedgerError::BatchFinalized(batch_id));
    }
    Ok(())
}
