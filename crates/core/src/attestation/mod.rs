//! Dual-signature attestation state machine.
//!
//! A count moves through `Open → PrimaryAttested → SecondaryAttested →
//! Finalized`. The middle two states are persisted as nullable attestor
//! columns, but this module treats them as first-class states so transition
//! logic is exhaustive and an invalid combination (secondary set while
//! primary null) cannot be silently accepted.
//!
//! Requiring a *different, verified* second person prevents a single usher
//! from unilaterally certifying a count.

pub mod error;
pub mod machine;
pub mod types;

#[cfg(test)]
mod machine_props;

pub use error::AttestationError;
pub use machine::AttestationService;
pub use types::{
    AttestationAction, AttestationStage, AttestationState, Attestor, ConfirmOutcome,
};
