//! Donation repository for ledger mutations.
//!
//! Every mutation re-checks the owning batch's status inside its
//! transaction so a concurrent finalization can never be bypassed.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use plately_core::ledger::{self, DonationInput, DonationType, LedgerError};

use crate::entities::{batches, donations, sea_orm_active_enums};

use super::batch::{db_status_to_core, recompute_total};

/// Errors from donation operations.
#[derive(Debug, thiserror::Error)]
pub enum DonationError {
    /// Donation does not exist in this congregation.
    #[error("donation not found: {0}")]
    NotFound(Uuid),
    /// Target batch does not exist in this congregation.
    #[error("batch not found: {0}")]
    BatchNotFound(Uuid),
    /// Domain validation failed.
    #[error(transparent)]
    Invalid(#[from] LedgerError),
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for DonationError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

/// Input for recording a donation.
#[derive(Debug, Clone)]
pub struct CreateDonationInput {
    /// Batch to attach to, or `None` for an unassigned donation.
    pub batch_id: Option<Uuid>,
    /// Contributor, or `None` for anonymous.
    pub member_id: Option<Uuid>,
    /// Date the donation was received.
    pub donation_date: NaiveDate,
    /// Cash or check.
    pub donation_type: DonationType,
    /// Amount, must be positive.
    pub amount: Decimal,
    /// Check number, required iff `donation_type` is check.
    pub check_number: Option<String>,
    /// Free-form notes.
    pub notes: Option<String>,
}

/// Input for editing a donation. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateDonationInput {
    /// New contributor. `Some(None)` detaches the member.
    pub member_id: Option<Option<Uuid>>,
    /// New donation date.
    pub donation_date: Option<NaiveDate>,
    /// New donation type.
    pub donation_type: Option<DonationType>,
    /// New amount.
    pub amount: Option<Decimal>,
    /// New check number. `Some(None)` clears it.
    pub check_number: Option<Option<String>>,
    /// New notes. `Some(None)` clears them.
    pub notes: Option<Option<String>>,
}

/// Repository for donation ledger mutations.
#[derive(Debug, Clone)]
pub struct DonationRepository {
    db: DatabaseConnection,
}

impl DonationRepository {
    /// Creates a new donation repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records a donation, attaching it to a batch when one is given.
    ///
    /// # Errors
    ///
    /// Returns a validation error, `BatchNotFound`, or `BatchFinalized`
    /// when the target batch is locked.
    pub async fn create(
        &self,
        congregation_id: Uuid,
        input: CreateDonationInput,
    ) -> Result<donations::Model, DonationError> {
        let check_number = ledger::normalize_check_number(input.check_number);
        ledger::validate_donation(&DonationInput {
            donation_date: input.donation_date,
            amount: input.amount,
            donation_type: input.donation_type,
            check_number: check_number.clone(),
            member_id: input.member_id,
            notes: input.notes.clone(),
        })?;

        let txn = self.db.begin().await?;

        if let Some(batch_id) = input.batch_id {
            lock_open_batch(&txn, congregation_id, batch_id).await?;
        }

        let now = Utc::now().into();
        let donation = donations::ActiveModel {
            id: Set(Uuid::new_v4()),
            congregation_id: Set(congregation_id),
            batch_id: Set(input.batch_id),
            member_id: Set(input.member_id),
            donation_date: Set(input.donation_date),
            donation_type: Set(core_type_to_db(input.donation_type)),
            amount: Set(input.amount),
            check_number: Set(check_number),
            notes: Set(input.notes),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let inserted = donation.insert(&txn).await?;

        if let Some(batch_id) = input.batch_id {
            recompute_total(&txn, batch_id).await?;
        }

        txn.commit().await?;
        Ok(inserted)
    }

    /// Edits a donation in place. The owning batch must still be open.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, a validation error, or `BatchFinalized`.
    pub async fn update(
        &self,
        congregation_id: Uuid,
        donation_id: Uuid,
        input: UpdateDonationInput,
    ) -> Result<donations::Model, DonationError> {
        let txn = self.db.begin().await?;

        let donation = donations::Entity::find_by_id(donation_id)
            .filter(donations::Column::CongregationId.eq(congregation_id))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(DonationError::NotFound(donation_id))?;

        if let Some(batch_id) = donation.batch_id {
            lock_open_batch(&txn, congregation_id, batch_id).await?;
        }

        let donation_type = input
            .donation_type
            .unwrap_or_else(|| db_type_to_core(donation.donation_type));
        let check_number = ledger::normalize_check_number(match input.check_number {
            Some(value) => value,
            None => donation.check_number.clone(),
        });
        let member_id = match input.member_id {
            Some(value) => value,
            None => donation.member_id,
        };
        let merged = DonationInput {
            donation_date: input.donation_date.unwrap_or(donation.donation_date),
            amount: input.amount.unwrap_or(donation.amount),
            donation_type,
            check_number: check_number.clone(),
            member_id,
            notes: match input.notes.clone() {
                Some(value) => value,
                None => donation.notes.clone(),
            },
        };
        ledger::validate_donation(&merged)?;

        let batch_id = donation.batch_id;
        let mut active: donations::ActiveModel = donation.into();
        active.member_id = Set(merged.member_id);
        active.donation_date = Set(merged.donation_date);
        active.donation_type = Set(core_type_to_db(merged.donation_type));
        active.amount = Set(merged.amount);
        active.check_number = Set(merged.check_number);
        active.notes = Set(merged.notes);
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(&txn).await?;

        if let Some(batch_id) = batch_id {
            recompute_total(&txn, batch_id).await?;
        }

        txn.commit().await?;
        Ok(updated)
    }

    /// Deletes a donation. The owning batch must still be open.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `BatchFinalized`.
    pub async fn delete(
        &self,
        congregation_id: Uuid,
        donation_id: Uuid,
    ) -> Result<(), DonationError> {
        let txn = self.db.begin().await?;

        let donation = donations::Entity::find_by_id(donation_id)
            .filter(donations::Column::CongregationId.eq(congregation_id))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(DonationError::NotFound(donation_id))?;

        if let Some(batch_id) = donation.batch_id {
            lock_open_batch(&txn, congregation_id, batch_id).await?;
        }

        let batch_id = donation.batch_id;
        donations::Entity::delete_by_id(donation.id).exec(&txn).await?;

        if let Some(batch_id) = batch_id {
            recompute_total(&txn, batch_id).await?;
        }

        txn.commit().await?;
        Ok(())
    }

    /// Moves a donation between batches (or detaches it with `None`).
    /// Both the source and target batch must be open.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `BatchNotFound`, or `BatchFinalized`.
    pub async fn move_donation(
        &self,
        congregation_id: Uuid,
        donation_id: Uuid,
        new_batch_id: Option<Uuid>,
    ) -> Result<donations::Model, DonationError> {
        let txn = self.db.begin().await?;

        let donation = donations::Entity::find_by_id(donation_id)
            .filter(donations::Column::CongregationId.eq(congregation_id))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(DonationError::NotFound(donation_id))?;

        // Lock affected batches in id order so two concurrent moves
        // cannot deadlock.
        let mut affected: Vec<Uuid> = donation
            .batch_id
            .into_iter()
            .chain(new_batch_id)
            .collect();
        affected.sort_unstable();
        affected.dedup();
        for batch_id in &affected {
            lock_open_batch(&txn, congregation_id, *batch_id).await?;
        }

        let old_batch_id = donation.batch_id;
        let mut active: donations::ActiveModel = donation.into();
        active.batch_id = Set(new_batch_id);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&txn).await?;

        if let Some(batch_id) = old_batch_id {
            recompute_total(&txn, batch_id).await?;
        }
        if let Some(batch_id) = new_batch_id {
            if old_batch_id != Some(batch_id) {
                recompute_total(&txn, batch_id).await?;
            }
        }

        txn.commit().await?;
        Ok(updated)
    }
}

/// Locks a batch row and verifies it is still open.
async fn lock_open_batch(
    txn: &DatabaseTransaction,
    congregation_id: Uuid,
    batch_id: Uuid,
) -> Result<batches::Model, DonationError> {
    let batch = batches::Entity::find_by_id(batch_id)
        .filter(batches::Column::CongregationId.eq(congregation_id))
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or(DonationError::BatchNotFound(batch_id))?;

    ledger::validate_batch_open(batch.id, db_status_to_core(&batch.status))?;
    Ok(batch)
}

/// Maps a domain donation type to its stored representation.
#[must_use]
pub const fn core_type_to_db(value: DonationType) -> sea_orm_active_enums::DonationType {
    match value {
        DonationType::Cash => sea_orm_active_enums::DonationType::Cash,
        DonationType::Check => sea_orm_active_enums::DonationType::Check,
    }
}

/// Maps a stored donation type to the domain enum.
#[must_use]
pub const fn db_type_to_core(value: sea_orm_active_enums::DonationType) -> DonationType {
    match value {
        sea_orm_active_enums::DonationType::Cash => DonationType::Cash,
        sea_orm_active_enums::DonationType::Check => DonationType::Check,
    }
}
