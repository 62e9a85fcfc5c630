//! Property-based tests for the attestation state machine.
//!
//! Validates monotonicity (stages never move backwards), attestor
//! distinctness, and the empty-batch gate with randomized inputs.

use proptest::prelude::*;
use uuid::Uuid;

use crate::attestation::error::AttestationError;
use crate::attestation::machine::AttestationService;
use crate::attestation::types::{AttestationStage, AttestationState, Attestor, ConfirmOutcome};

/// Strategy for generating random UUIDs.
fn arb_uuid() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

/// Strategy for generating signature names.
fn arb_name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z .]{0,40}".prop_map(|s| s.trim().to_string())
}

/// Strategy for generating an attestor.
fn arb_attestor() -> impl Strategy<Value = Attestor> {
    (arb_uuid(), arb_name()).prop_map(|(id, name)| Attestor { id, name })
}

/// Strategy for generating any attestation state.
fn arb_state() -> impl Strategy<Value = AttestationState> {
    prop_oneof![
        Just(AttestationState::Open),
        arb_attestor().prop_map(|primary| AttestationState::PrimaryAttested { primary }),
        (arb_attestor(), arb_attestor())
            .prop_filter("distinct attestors", |(p, s)| p.id != s.id)
            .prop_map(|(primary, secondary)| AttestationState::SecondaryAttested {
                primary,
                secondary
            }),
        (arb_attestor(), arb_attestor())
            .prop_filter("distinct attestors", |(p, s)| p.id != s.id)
            .prop_map(|(primary, secondary)| AttestationState::Finalized {
                primary,
                secondary,
                confirmed_at: chrono::Utc::now(),
            }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// attest-primary only ever succeeds from Open, and only with donations.
    #[test]
    fn prop_attest_primary_gated(
        state in arb_state(),
        actor in arb_uuid(),
        name in arb_name(),
        donation_count in 0usize..20,
    ) {
        prop_assume!(!name.is_empty());
        let result = AttestationService::attest_primary(&state, actor, &name, donation_count);
        match (state.stage(), donation_count) {
            (AttestationStage::Open, 0) => {
                prop_assert!(matches!(result, Err(AttestationError::EmptyBatch)));
            }
            (AttestationStage::Open, _) => prop_assert!(result.is_ok()),
            _ => prop_assert!(
                matches!(result, Err(AttestationError::InvalidState { .. })),
                "expected InvalidState error"
            ),
        }
    }

    /// A successful secondary attestation never records the primary's identity.
    #[test]
    fn prop_attestor_distinctness(
        primary in arb_attestor(),
        actor in arb_uuid(),
        name in arb_name(),
    ) {
        prop_assume!(!name.is_empty());
        let state = AttestationState::PrimaryAttested { primary: primary.clone() };
        let result = AttestationService::attest_secondary(&state, actor, true, &name);
        if actor == primary.id {
            prop_assert!(matches!(result, Err(AttestationError::SelfAttestation)));
        } else {
            prop_assert!(result.is_ok());
        }
    }

    /// Unverified actors never pass the secondary gate, whatever the state.
    #[test]
    fn prop_unverified_never_attests_second(
        state in arb_state(),
        actor in arb_uuid(),
        name in arb_name(),
    ) {
        prop_assume!(!name.is_empty());
        // Identity collision with the generated primary is possible but
        // the result must still be an error of some kind.
        let result = AttestationService::attest_secondary(&state, actor, false, &name);
        if state.stage() == AttestationStage::PrimaryAttested {
            prop_assert!(
                matches!(
                    result,
                    Err(AttestationError::UnverifiedAttestor { .. })
                        | Err(AttestationError::SelfAttestation)
                ),
                "expected UnverifiedAttestor or SelfAttestation error"
            );
        } else {
            prop_assert!(
                matches!(result, Err(AttestationError::InvalidState { .. })),
                "expected InvalidState error"
            );
        }
    }

    /// confirm never moves a batch backwards: it either finalizes from
    /// SecondaryAttested, no-ops on Finalized, or errors.
    #[test]
    fn prop_confirm_monotonic(state in arb_state()) {
        let result = AttestationService::confirm_finalization(&state);
        match state.stage() {
            AttestationStage::SecondaryAttested => {
                prop_assert!(
                    matches!(result, Ok(ConfirmOutcome::Finalize { .. })),
                    "expected Finalize outcome"
                );
            }
            AttestationStage::Finalized => {
                prop_assert!(matches!(result, Ok(ConfirmOutcome::AlreadyFinalized)));
            }
            _ => prop_assert!(result.is_err()),
        }
    }

    /// Every valid transition moves exactly one stage forward.
    #[test]
    fn prop_valid_transitions_step_forward(
        from in prop_oneof![
            Just(AttestationStage::Open),
            Just(AttestationStage::PrimaryAttested),
            Just(AttestationStage::SecondaryAttested),
            Just(AttestationStage::Finalized),
        ],
        to in prop_oneof![
            Just(AttestationStage::Open),
            Just(AttestationStage::PrimaryAttested),
            Just(AttestationStage::SecondaryAttested),
            Just(AttestationStage::Finalized),
        ],
    ) {
        if AttestationService::is_valid_transition(from, to) {
            prop_assert!(to > from, "transitions must be monotonic");
            prop_assert_eq!(to as u8, from as u8 + 1, "no stage may be skipped");
        }
    }
}
