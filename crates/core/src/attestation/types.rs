//! Attestation domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::error::AttestationError;
use crate::batch::types::BatchStatus;

/// A recorded attestor: the acting identity plus the name they signed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestor {
    /// Identity of the acting user.
    pub id: Uuid,
    /// The signature name the attestor entered.
    pub name: String,
}

/// Stage of the attestation workflow, ordered.
///
/// Stages are ordered so monotonicity (a batch never moves backwards) can
/// be asserted directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttestationStage {
    /// No attestor recorded.
    Open = 0,
    /// Primary attestor recorded, secondary outstanding.
    PrimaryAttested = 1,
    /// Both attestors recorded, finalize outstanding.
    SecondaryAttested = 2,
    /// Terminal. The count is financial fact.
    Finalized = 3,
}

impl AttestationStage {
    /// Returns the string representation of the stage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::PrimaryAttested => "primary_attested",
            Self::SecondaryAttested => "secondary_attested",
            Self::Finalized => "finalized",
        }
    }
}

impl fmt::Display for AttestationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Attestation state of a batch, derived from its persisted fields.
///
/// The persisted shape is `status` plus four nullable attestor columns;
/// this tagged form makes transition logic exhaustive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttestationState {
    /// No attestor recorded; donations may still be edited.
    Open,
    /// Primary attestor recorded.
    PrimaryAttested {
        /// The first attestor.
        primary: Attestor,
    },
    /// Both attestors recorded; awaiting finalize confirmation.
    SecondaryAttested {
        /// The first attestor.
        primary: Attestor,
        /// The second, distinct attestor.
        secondary: Attestor,
    },
    /// Terminal state; the batch and its donations are read-only.
    Finalized {
        /// The first attestor.
        primary: Attestor,
        /// The second attestor.
        secondary: Attestor,
        /// When finalization was confirmed.
        confirmed_at: DateTime<Utc>,
    },
}

impl AttestationState {
    /// Derives the state from persisted batch fields.
    ///
    /// # Errors
    ///
    /// Returns `AttestationError::CorruptAttestation` for combinations the
    /// invariants forbid: a secondary without a primary, identical
    /// attestors, a finalized batch missing attestors or confirmation
    /// timestamp, or a confirmation timestamp on an open batch.
    pub fn derive(
        status: BatchStatus,
        primary: Option<Attestor>,
        secondary: Option<Attestor>,
        confirmed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, AttestationError> {
        if let (Some(p), Some(s)) = (&primary, &secondary)
            && p.id == s.id
        {
            return Err(AttestationError::CorruptAttestation {
                detail: "primary and secondary attestor are the same identity".to_string(),
            });
        }

        match (status, primary, secondary, confirmed_at) {
            (BatchStatus::Open, None, None, None) => Ok(Self::Open),
            (BatchStatus::Open, Some(primary), None, None) => {
                Ok(Self::PrimaryAttested { primary })
            }
            (BatchStatus::Open, Some(primary), Some(secondary), None) => {
                Ok(Self::SecondaryAttested { primary, secondary })
            }
            (BatchStatus::Finalized, Some(primary), Some(secondary), Some(confirmed_at)) => {
                Ok(Self::Finalized {
                    primary,
                    secondary,
                    confirmed_at,
                })
            }
            (BatchStatus::Open, None, Some(_), _) => Err(AttestationError::CorruptAttestation {
                detail: "secondary attestor set without a primary".to_string(),
            }),
            (BatchStatus::Open, _, _, Some(_)) => Err(AttestationError::CorruptAttestation {
                detail: "confirmation date set on an open batch".to_string(),
            }),
            (BatchStatus::Finalized, ..) => Err(AttestationError::CorruptAttestation {
                detail: "finalized batch missing attestors or confirmation date".to_string(),
            }),
        }
    }

    /// Returns the ordered stage of this state.
    #[must_use]
    pub const fn stage(&self) -> AttestationStage {
        match self {
            Self::Open => AttestationStage::Open,
            Self::PrimaryAttested { .. } => AttestationStage::PrimaryAttested,
            Self::SecondaryAttested { .. } => AttestationStage::SecondaryAttested,
            Self::Finalized { .. } => AttestationStage::Finalized,
        }
    }

    /// Returns true for the terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized { .. })
    }

    /// Returns the primary attestor, if recorded.
    #[must_use]
    pub const fn primary(&self) -> Option<&Attestor> {
        match self {
            Self::Open => None,
            Self::PrimaryAttested { primary }
            | Self::SecondaryAttested { primary, .. }
            | Self::Finalized { primary, .. } => Some(primary),
        }
    }
}

/// A validated attestation transition with its audit data.
#[derive(Debug, Clone)]
pub enum AttestationAction {
    /// Record the primary attestor.
    AttestPrimary {
        /// The attestor being recorded.
        attestor: Attestor,
        /// When the attestation was recorded.
        attested_at: DateTime<Utc>,
    },
    /// Record the secondary attestor.
    AttestSecondary {
        /// The attestor being recorded.
        attestor: Attestor,
        /// When the attestation was recorded.
        attested_at: DateTime<Utc>,
    },
}

/// Outcome of a finalize confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// This call performs the terminal transition. Report dispatch is gated
    /// on this outcome, never on merely observing a finalized batch.
    Finalize {
        /// Timestamp to record as the confirmation date.
        confirmed_at: DateTime<Utc>,
    },
    /// The batch was already finalized; succeed without side effects.
    AlreadyFinalized,
}
