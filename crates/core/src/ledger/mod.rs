//! Donation ledger logic.
//!
//! Individual cash/check donation records tied to a batch. This module
//! validates donation input and enforces the one guard most easily missed:
//! no mutation of any kind against a finalized batch.

pub mod error;
pub mod types;
pub mod validation;

pub use error::LedgerError;
pub use types::{DonationInput, DonationLine, DonationType};
pub use validation::{normalize_check_number, validate_batch_open, validate_donation};
