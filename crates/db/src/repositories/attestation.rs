//! Attestation repository for batch state transitions.
//!
//! Each transition is a single conditional `UPDATE` whose `WHERE` clause
//! restates the expected preconditions. Two racing callers produce exactly
//! one affected row; the loser re-fetches and reports the precise domain
//! error for the state the winner left behind.

use chrono::Utc;
use sea_orm::{
    ActiveEnum, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    sea_query::Expr,
};
use uuid::Uuid;

use plately_core::attestation::{
    AttestationError, AttestationService, AttestationState, Attestor, ConfirmOutcome,
};

use crate::entities::{batches, donations, sea_orm_active_enums};

use super::batch::db_status_to_core;
use super::event::BatchEventRepository;

/// Result of a confirm-attestation call.
#[derive(Debug, Clone)]
pub struct ConfirmResult {
    /// The batch after the call.
    pub batch: batches::Model,
    /// Whether this call performed the finalizing transition. Report
    /// dispatch fires only when true.
    pub caused_transition: bool,
}

/// Repository for attestation state transitions.
#[derive(Debug, Clone)]
pub struct AttestationRepository {
    db: DatabaseConnection,
}

impl AttestationRepository {
    /// Creates a new attestation repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Derives the domain attestation state from a stored batch row.
    ///
    /// # Errors
    ///
    /// Returns `CorruptAttestation` when the nullable columns do not form
    /// a valid state.
    pub fn state_of(batch: &batches::Model) -> Result<AttestationState, AttestationError> {
        let primary = match (&batch.primary_attestor_id, &batch.primary_attestor_name) {
            (Some(id), Some(name)) => Some(Attestor {
                id: *id,
                name: name.clone(),
            }),
            (None, None) => None,
            _ => {
                return Err(AttestationError::CorruptAttestation {
                    detail: "primary attestor id and name are out of sync".to_string(),
                });
            }
        };
        let secondary = match (&batch.secondary_attestor_id, &batch.secondary_attestor_name) {
            (Some(id), Some(name)) => Some(Attestor {
                id: *id,
                name: name.clone(),
            }),
            (None, None) => None,
            _ => {
                return Err(AttestationError::CorruptAttestation {
                    detail: "secondary attestor id and name are out of sync".to_string(),
                });
            }
        };

        AttestationState::derive(
            db_status_to_core(&batch.status),
            primary,
            secondary,
            batch.attestation_confirmed_at.map(Into::into),
        )
    }

    /// Records the primary attestation on an open, non-empty batch.
    ///
    /// # Errors
    ///
    /// Returns `BatchNotFound`, `EmptyBatch`, `SignatureNameRequired`, or
    /// `InvalidState`.
    pub async fn attest_primary(
        &self,
        congregation_id: Uuid,
        batch_id: Uuid,
        actor_id: Uuid,
        signature_name: &str,
    ) -> Result<batches::Model, AttestationError> {
        let batch = self.fetch(congregation_id, batch_id).await?;
        let donation_count = donations::Entity::find()
            .filter(donations::Column::BatchId.eq(batch_id))
            .count(&self.db)
            .await
            .map_err(|e| AttestationError::Database(e.to_string()))?;

        let state = Self::state_of(&batch)?;
        let action = AttestationService::attest_primary(
            &state,
            actor_id,
            signature_name,
            usize::try_from(donation_count).unwrap_or(usize::MAX),
        )?;
        let (attestor, attested_at) = match action {
            plately_core::attestation::AttestationAction::AttestPrimary {
                attestor,
                attested_at,
            }
            | plately_core::attestation::AttestationAction::AttestSecondary {
                attestor,
                attested_at,
            } => (attestor, attested_at),
        };

        let result = batches::Entity::update_many()
            .filter(batches::Column::Id.eq(batch_id))
            .filter(batches::Column::CongregationId.eq(congregation_id))
            .filter(batches::Column::PrimaryAttestorId.is_null())
            .filter(
                batches::Column::Status.ne(sea_orm_active_enums::BatchStatus::Finalized),
            )
            .col_expr(batches::Column::PrimaryAttestorId, Expr::value(attestor.id))
            .col_expr(
                batches::Column::PrimaryAttestorName,
                Expr::value(attestor.name.clone()),
            )
            .col_expr(
                batches::Column::PrimaryAttestedAt,
                Expr::value(chrono::DateTime::<chrono::FixedOffset>::from(attested_at)),
            )
            .col_expr(
                batches::Column::UpdatedAt,
                Expr::value(chrono::DateTime::<chrono::FixedOffset>::from(Utc::now())),
            )
            .exec(&self.db)
            .await
            .map_err(|e| AttestationError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            // Lost a race. Re-derive and report the state we actually hit.
            let current = self.fetch(congregation_id, batch_id).await?;
            let state = Self::state_of(&current)?;
            return Err(AttestationError::InvalidState {
                stage: state.stage(),
                action: "attest-primary",
            });
        }

        let updated = self.fetch(congregation_id, batch_id).await?;
        BatchEventRepository::append(
            &self.db,
            batch_id,
            "primary_attested",
            Some(attestor.id),
            Some(attestor.name),
        )
        .await
        .map_err(|e| AttestationError::Database(e.to_string()))?;

        Ok(updated)
    }

    /// Records the secondary attestation by a verified, distinct user.
    ///
    /// # Errors
    ///
    /// Returns `BatchNotFound`, `SelfAttestation`, `UnverifiedAttestor`,
    /// `SignatureNameRequired`, or `InvalidState`.
    pub async fn attest_secondary(
        &self,
        congregation_id: Uuid,
        batch_id: Uuid,
        actor_id: Uuid,
        actor_verified: bool,
        signature_name: &str,
    ) -> Result<batches::Model, AttestationError> {
        let batch = self.fetch(congregation_id, batch_id).await?;
        let state = Self::state_of(&batch)?;
        let action =
            AttestationService::attest_secondary(&state, actor_id, actor_verified, signature_name)?;
        let (attestor, attested_at) = match action {
            plately_core::attestation::AttestationAction::AttestPrimary {
                attestor,
                attested_at,
            }
            | plately_core::attestation::AttestationAction::AttestSecondary {
                attestor,
                attested_at,
            } => (attestor, attested_at),
        };

        let result = batches::Entity::update_many()
            .filter(batches::Column::Id.eq(batch_id))
            .filter(batches::Column::CongregationId.eq(congregation_id))
            .filter(batches::Column::PrimaryAttestorId.is_not_null())
            .filter(batches::Column::PrimaryAttestorId.ne(actor_id))
            .filter(batches::Column::SecondaryAttestorId.is_null())
            .filter(
                batches::Column::Status.ne(sea_orm_active_enums::BatchStatus::Finalized),
            )
            .col_expr(
                batches::Column::SecondaryAttestorId,
                Expr::value(attestor.id),
            )
            .col_expr(
                batches::Column::SecondaryAttestorName,
                Expr::value(attestor.name.clone()),
            )
            .col_expr(
                batches::Column::SecondaryAttestedAt,
                Expr::value(chrono::DateTime::<chrono::FixedOffset>::from(attested_at)),
            )
            .col_expr(
                batches::Column::UpdatedAt,
                Expr::value(chrono::DateTime::<chrono::FixedOffset>::from(Utc::now())),
            )
            .exec(&self.db)
            .await
            .map_err(|e| AttestationError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            let current = self.fetch(congregation_id, batch_id).await?;
            let state = Self::state_of(&current)?;
            // Re-run the machine so the caller gets the precise error.
            return match AttestationService::attest_secondary(
                &state,
                actor_id,
                actor_verified,
                signature_name,
            ) {
                Ok(_) => Err(AttestationError::InvalidState {
                    stage: state.stage(),
                    action: "attest-secondary",
                }),
                Err(e) => Err(e),
            };
        }

        let updated = self.fetch(congregation_id, batch_id).await?;
        BatchEventRepository::append(
            &self.db,
            batch_id,
            "secondary_attested",
            Some(attestor.id),
            Some(attestor.name),
        )
        .await
        .map_err(|e| AttestationError::Database(e.to_string()))?;

        Ok(updated)
    }

    /// Confirms finalization. Idempotent: confirming an already finalized
    /// batch reports success with `caused_transition` false.
    ///
    /// # Errors
    ///
    /// Returns `BatchNotFound` or `InvalidState`.
    pub async fn confirm_finalization(
        &self,
        congregation_id: Uuid,
        batch_id: Uuid,
        actor_id: Uuid,
        actor_name: &str,
    ) -> Result<ConfirmResult, AttestationError> {
        let batch = self.fetch(congregation_id, batch_id).await?;
        let state = Self::state_of(&batch)?;

        let confirmed_at = match AttestationService::confirm_finalization(&state)? {
            ConfirmOutcome::AlreadyFinalized => {
                return Ok(ConfirmResult {
                    batch,
                    caused_transition: false,
                });
            }
            ConfirmOutcome::Finalize { confirmed_at } => confirmed_at,
        };

        let result = batches::Entity::update_many()
            .filter(batches::Column::Id.eq(batch_id))
            .filter(batches::Column::CongregationId.eq(congregation_id))
            .filter(batches::Column::SecondaryAttestorId.is_not_null())
            .filter(batches::Column::AttestationConfirmedAt.is_null())
            .filter(
                batches::Column::Status.ne(sea_orm_active_enums::BatchStatus::Finalized),
            )
            .col_expr(
                batches::Column::Status,
                sea_orm_active_enums::BatchStatus::Finalized.as_enum(),
            )
            .col_expr(
                batches::Column::AttestationConfirmedAt,
                Expr::value(chrono::DateTime::<chrono::FixedOffset>::from(confirmed_at)),
            )
            .col_expr(
                batches::Column::UpdatedAt,
                Expr::value(chrono::DateTime::<chrono::FixedOffset>::from(Utc::now())),
            )
            .exec(&self.db)
            .await
            .map_err(|e| AttestationError::Database(e.to_string()))?;

        let current = self.fetch(congregation_id, batch_id).await?;

        if result.rows_affected == 0 {
            // Someone else finalized first: idempotent success. Any other
            // state means the preconditions evaporated under us.
            let state = Self::state_of(&current)?;
            return match state {
                AttestationState::Finalized { .. } => Ok(ConfirmResult {
                    batch: current,
                    caused_transition: false,
                }),
                _ => Err(AttestationError::InvalidState {
                    stage: state.stage(),
                    action: "confirm-attestation",
                }),
            };
        }

        BatchEventRepository::append(
            &self.db,
            batch_id,
            "finalized",
            Some(actor_id),
            Some(actor_name.to_string()),
        )
        .await
        .map_err(|e| AttestationError::Database(e.to_string()))?;

        Ok(ConfirmResult {
            batch: current,
            caused_transition: true,
        })
    }

    async fn fetch(
        &self,
        congregation_id: Uuid,
        batch_id: Uuid,
    ) -> Result<batches::Model, AttestationError> {
        batches::Entity::find_by_id(batch_id)
            .filter(batches::Column::CongregationId.eq(congregation_id))
            .one(&self.db)
            .await
            .map_err(|e| AttestationError::Database(e.to_string()))?
            .ok_or(AttestationError::BatchNotFound(batch_id))
    }
}
