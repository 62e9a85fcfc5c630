//! Core business logic for Plately.
//!
//! This crate contains pure business logic with ZERO web or database
//! dependencies. All domain types, state machine rules, and calculations
//! live here.
//!
//! # Modules
//!
//! - `batch` - Count aggregates: status, totals, cash/check partition
//! - `attestation` - Dual-signature attestation state machine
//! - `ledger` - Donation validation and the finalized-batch guard
//! - `report` - Count report building (summary, CSV export, email body)

pub mod attestation;
pub mod batch;
pub mod ledger;
pub mod report;
