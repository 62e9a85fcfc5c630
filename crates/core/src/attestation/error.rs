//! Error types for attestation transitions.

use thiserror::Error;
use uuid::Uuid;

use super::types::AttestationStage;

/// Errors that can occur during attestation operations.
#[derive(Debug, Error)]
pub enum AttestationError {
    /// Attestation attempted on a batch with zero donations.
    #[error("Batch has no donations; an empty count cannot be attested")]
    EmptyBatch,

    /// Transition attempted out of order or twice.
    #[error("Cannot {action} a batch in the {stage} stage")]
    InvalidState {
        /// The stage the batch was in.
        stage: AttestationStage,
        /// The attempted action.
        action: &'static str,
    },

    /// Secondary attestor equals the primary attestor.
    #[error("Secondary attestor must be a different person than the primary attestor")]
    SelfAttestation,

    /// Secondary attestor is not a verified identity.
    #[error("User {attestor_id} is not verified and cannot serve as secondary attestor")]
    UnverifiedAttestor {
        /// The ineligible identity.
        attestor_id: Uuid,
    },

    /// A signature name is required but was not provided.
    #[error("A signature name is required")]
    SignatureNameRequired,

    /// Persisted fields violate the attestation invariants.
    #[error("Batch attestation fields are inconsistent: {detail}")]
    CorruptAttestation {
        /// What was inconsistent.
        detail: String,
    },

    /// Batch not found.
    #[error("Batch {0} not found")]
    BatchNotFound(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl AttestationError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidState { .. } | Self::SignatureNameRequired | Self::EmptyBatch => 400,
            Self::SelfAttestation | Self::UnverifiedAttestor { .. } => 403,
            Self::BatchNotFound(_) => 404,
            Self::CorruptAttestation { .. } | Self::Database(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyBatch => "EMPTY_BATCH",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::SelfAttestation => "SELF_ATTESTATION",
            Self::UnverifiedAttestor { .. } => "UNVERIFIED_ATTESTOR",
            Self::SignatureNameRequired => "SIGNATURE_NAME_REQUIRED",
            Self::CorruptAttestation { .. } => "CORRUPT_ATTESTATION",
            Self::BatchNotFound(_) => "BATCH_NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}
