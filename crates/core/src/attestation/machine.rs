//! State machine rules for attestation transitions.
//!
//! All methods are stateless associated functions that validate a proposed
//! transition against the current derived state and return the action to
//! persist. Persisting the action atomically (conditional single-row
//! update) is the repository's job; racing callers lose there, not here.

use chrono::Utc;
use uuid::Uuid;

use super::error::AttestationError;
use super::types::{
    AttestationAction, AttestationStage, AttestationState, Attestor, ConfirmOutcome,
};

/// Stateless service validating attestation transitions.
pub struct AttestationService;

impl AttestationService {
    /// Records the primary attestation on an open batch.
    ///
    /// Preconditions: the batch is in the `Open` stage and has at least one
    /// donation. The acting user needs no further eligibility.
    ///
    /// # Errors
    ///
    /// * `AttestationError::InvalidState` if a primary attestor exists or
    ///   the batch is finalized
    /// * `AttestationError::EmptyBatch` if the donation count is zero
    /// * `AttestationError::SignatureNameRequired` if the name is blank
    pub fn attest_primary(
        state: &AttestationState,
        actor_id: Uuid,
        signature_name: &str,
        donation_count: usize,
    ) -> Result<AttestationAction, AttestationError> {
        if signature_name.trim().is_empty() {
            return Err(AttestationError::SignatureNameRequired);
        }

        match state {
            AttestationState::Open => {
                if donation_count == 0 {
                    return Err(AttestationError::EmptyBatch);
                }
                Ok(AttestationAction::AttestPrimary {
                    attestor: Attestor {
                        id: actor_id,
                        name: signature_name.trim().to_string(),
                    },
                    attested_at: Utc::now(),
                })
            }
            _ => Err(AttestationError::InvalidState {
                stage: state.stage(),
                action: "attest-primary",
            }),
        }
    }

    /// Records the secondary attestation.
    ///
    /// Preconditions: a primary attestor is recorded and no secondary is,
    /// the actor differs from the primary attestor, and the actor is a
    /// verified identity.
    ///
    /// # Errors
    ///
    /// * `AttestationError::InvalidState` if not in `PrimaryAttested`
    /// * `AttestationError::SelfAttestation` if actor equals the primary
    /// * `AttestationError::UnverifiedAttestor` if the actor is unverified
    /// * `AttestationError::SignatureNameRequired` if the name is blank
    pub fn attest_secondary(
        state: &AttestationState,
        actor_id: Uuid,
        actor_verified: bool,
        signature_name: &str,
    ) -> Result<AttestationAction, AttestationError> {
        if signature_name.trim().is_empty() {
            return Err(AttestationError::SignatureNameRequired);
        }

        match state {
            AttestationState::PrimaryAttested { primary } => {
                if actor_id == primary.id {
                    return Err(AttestationError::SelfAttestation);
                }
                if !actor_verified {
                    return Err(AttestationError::UnverifiedAttestor {
                        attestor_id: actor_id,
                    });
                }
                Ok(AttestationAction::AttestSecondary {
                    attestor: Attestor {
                        id: actor_id,
                        name: signature_name.trim().to_string(),
                    },
                    attested_at: Utc::now(),
                })
            }
            _ => Err(AttestationError::InvalidState {
                stage: state.stage(),
                action: "attest-secondary",
            }),
        }
    }

    /// Confirms finalization, the single irreversible transition.
    ///
    /// Out of `SecondaryAttested` this yields `ConfirmOutcome::Finalize`;
    /// on an already-finalized batch it yields
    /// `ConfirmOutcome::AlreadyFinalized` so a client retry after a timeout
    /// observes success without a second report dispatch.
    ///
    /// # Errors
    ///
    /// Returns `AttestationError::InvalidState` while either attestor is
    /// outstanding.
    pub fn confirm_finalization(
        state: &AttestationState,
    ) -> Result<ConfirmOutcome, AttestationError> {
        match state {
            AttestationState::SecondaryAttested { .. } => Ok(ConfirmOutcome::Finalize {
                confirmed_at: Utc::now(),
            }),
            AttestationState::Finalized { .. } => Ok(ConfirmOutcome::AlreadyFinalized),
            AttestationState::Open | AttestationState::PrimaryAttested { .. } => {
                Err(AttestationError::InvalidState {
                    stage: state.stage(),
                    action: "confirm-attestation",
                })
            }
        }
    }

    /// Check if a stage transition is valid.
    ///
    /// Valid transitions:
    /// - Open → PrimaryAttested (attest-primary)
    /// - PrimaryAttested → SecondaryAttested (attest-secondary)
    /// - SecondaryAttested → Finalized (confirm-attestation)
    ///
    /// There is no backwards edge; abandoning the workflow is only possible
    /// while no attestor is recorded, which is not a transition here.
    #[must_use]
    pub fn is_valid_transition(from: AttestationStage, to: AttestationStage) -> bool {
        matches!(
            (from, to),
            (AttestationStage::Open, AttestationStage::PrimaryAttested)
                | (
                    AttestationStage::PrimaryAttested,
                    AttestationStage::SecondaryAttested
                )
                | (
                    AttestationStage::SecondaryAttested,
                    AttestationStage::Finalized
                )
        )
    }
}
