//! Error types for donation ledger operations.

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during donation ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Donation amount is zero.
    #[error("Donation amount must be greater than zero")]
    ZeroAmount,

    /// Donation amount is negative.
    #[error("Donation amount must not be negative")]
    NegativeAmount,

    /// Check donations must carry a check number.
    #[error("Check donations require a check number")]
    CheckNumberRequired,

    /// Cash donations must not carry a check number.
    #[error("Cash donations must not have a check number")]
    CheckNumberNotAllowed,

    /// The owning batch is finalized; the record is permanently locked.
    #[error("Batch {0} is finalized; its donations can no longer be modified")]
    BatchFinalized(Uuid),
}

impl LedgerError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::ZeroAmount
            | Self::NegativeAmount
            | Self::CheckNumberRequired
            | Self::CheckNumberNotAllowed => 400,
            Self::BatchFinalized(_) => 422,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ZeroAmount => "ZERO_AMOUNT",
            Self::NegativeAmount => "NEGATIVE_AMOUNT",
            Self::CheckNumberRequired => "CHECK_NUMBER_REQUIRED",
            Self::CheckNumberNotAllowed => "CHECK_NUMBER_NOT_ALLOWED",
            Self::BatchFinalized(_) => "BATCH_FINALIZED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_bad_request() {
        assert_eq!(LedgerError::ZeroAmount.status_code(), 400);
        assert_eq!(LedgerError::NegativeAmount.status_code(), 400);
        assert_eq!(LedgerError::CheckNumberRequired.status_code(), 400);
        assert_eq!(LedgerError::CheckNumberNotAllowed.status_code(), 400);
    }

    #[test]
    fn test_batch_finalized_error() {
        let err = LedgerError::BatchFinalized(Uuid::nil());
        assert_eq!(err.status_code(), 422);
        assert_eq!(err.error_code(), "BATCH_FINALIZED");
        assert!(err.to_string().contains("finalized"));
    }
}
