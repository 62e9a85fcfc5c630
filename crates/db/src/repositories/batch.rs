//! Batch repository for count lifecycle and read snapshots.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use plately_core::batch::BatchStatus;

use crate::entities::{batches, donations, sea_orm_active_enums};

/// Errors from batch operations.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// Batch does not exist in this congregation.
    #[error("batch not found: {0}")]
    NotFound(Uuid),
    /// The batch already carries at least one attestation.
    #[error("batch {0} already has attestations recorded")]
    AttestationStarted(Uuid),
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for BatchError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

/// Input for creating a batch.
#[derive(Debug, Clone)]
pub struct CreateBatchInput {
    /// Service name ("Sunday Morning", "Christmas Eve").
    pub service_name: String,
    /// Date of the service.
    pub service_date: NaiveDate,
    /// Optional free-form notes.
    pub notes: Option<String>,
}

/// Input for updating batch details. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateBatchInput {
    /// New service name.
    pub service_name: Option<String>,
    /// New service date.
    pub service_date: Option<NaiveDate>,
    /// New notes value. `Some(None)` clears the notes.
    pub notes: Option<Option<String>>,
}

/// Filter for listing batches.
#[derive(Debug, Clone, Default)]
pub struct BatchFilter {
    /// Restrict to a domain status.
    pub status: Option<BatchStatus>,
    /// Earliest service date, inclusive.
    pub from_date: Option<NaiveDate>,
    /// Latest service date, inclusive.
    pub to_date: Option<NaiveDate>,
}

/// Batch with its donations, as served to pollers.
#[derive(Debug, Clone)]
pub struct BatchSnapshot {
    /// The batch row.
    pub batch: batches::Model,
    /// Donations attached to the batch, in entry order.
    pub donations: Vec<donations::Model>,
}

/// Repository for batch lifecycle operations.
#[derive(Debug, Clone)]
pub struct BatchRepository {
    db: DatabaseConnection,
}

impl BatchRepository {
    /// Creates a new batch repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an open batch with a zero total.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn create(
        &self,
        congregation_id: Uuid,
        created_by: Uuid,
        input: CreateBatchInput,
    ) -> Result<batches::Model, BatchError> {
        let now = Utc::now().into();
        let batch = batches::ActiveModel {
            id: Set(Uuid::new_v4()),
            congregation_id: Set(congregation_id),
            service_name: Set(input.service_name),
            service_date: Set(input.service_date),
            notes: Set(input.notes),
            status: Set(sea_orm_active_enums::BatchStatus::Open),
            total_amount: Set(Decimal::ZERO),
            primary_attestor_id: Set(None),
            primary_attestor_name: Set(None),
            primary_attested_at: Set(None),
            secondary_attestor_id: Set(None),
            secondary_attestor_name: Set(None),
            secondary_attested_at: Set(None),
            attestation_confirmed_at: Set(None),
            created_by: Set(created_by),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(batch.insert(&self.db).await?)
    }

    /// Fetches a batch scoped to a congregation.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn find_by_id(
        &self,
        congregation_id: Uuid,
        batch_id: Uuid,
    ) -> Result<Option<batches::Model>, BatchError> {
        Ok(batches::Entity::find_by_id(batch_id)
            .filter(batches::Column::CongregationId.eq(congregation_id))
            .one(&self.db)
            .await?)
    }

    /// Fetches a batch together with its donations, the polled read snapshot.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the batch does not exist in this congregation.
    pub async fn get_with_donations(
        &self,
        congregation_id: Uuid,
        batch_id: Uuid,
    ) -> Result<BatchSnapshot, BatchError> {
        let batch = self
            .find_by_id(congregation_id, batch_id)
            .await?
            .ok_or(BatchError::NotFound(batch_id))?;

        let donations = donations::Entity::find()
            .filter(donations::Column::BatchId.eq(batch_id))
            .order_by_asc(donations::Column::CreatedAt)
            .order_by_asc(donations::Column::Id)
            .all(&self.db)
            .await?;

        Ok(BatchSnapshot { batch, donations })
    }

    /// Lists batches for a congregation, newest service date first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn list(
        &self,
        congregation_id: Uuid,
        filter: BatchFilter,
    ) -> Result<Vec<batches::Model>, BatchError> {
        let mut query = batches::Entity::find()
            .filter(batches::Column::CongregationId.eq(congregation_id));

        if let Some(status) = filter.status {
            query = match status {
                // Open covers the legacy 'closed' value as well.
                BatchStatus::Open => query.filter(
                    batches::Column::Status
                        .eq(sea_orm_active_enums::BatchStatus::Open)
                        .or(batches::Column::Status
                            .eq(sea_orm_active_enums::BatchStatus::Closed)),
                ),
                BatchStatus::Finalized => query.filter(
                    batches::Column::Status.eq(sea_orm_active_enums::BatchStatus::Finalized),
                ),
            };
        }
        if let Some(from) = filter.from_date {
            query = query.filter(batches::Column::ServiceDate.gte(from));
        }
        if let Some(to) = filter.to_date {
            query = query.filter(batches::Column::ServiceDate.lte(to));
        }

        Ok(query
            .order_by_desc(batches::Column::ServiceDate)
            .order_by_desc(batches::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// Updates batch details. Refused once any attestor has signed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `AttestationStarted`.
    pub async fn update_details(
        &self,
        congregation_id: Uuid,
        batch_id: Uuid,
        input: UpdateBatchInput,
    ) -> Result<batches::Model, BatchError> {
        let txn = self.db.begin().await?;

        let batch = batches::Entity::find_by_id(batch_id)
            .filter(batches::Column::CongregationId.eq(congregation_id))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(BatchError::NotFound(batch_id))?;

        if batch.attestation_started() {
            return Err(BatchError::AttestationStarted(batch_id));
        }

        let mut active: batches::ActiveModel = batch.into();
        if let Some(service_name) = input.service_name {
            active.service_name = Set(service_name);
        }
        if let Some(service_date) = input.service_date {
            active.service_date = Set(service_date);
        }
        if let Some(notes) = input.notes {
            active.notes = Set(notes);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(&txn).await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Deletes a batch and, via cascade, its donations. Refused once any
    /// attestor has signed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `AttestationStarted`.
    pub async fn delete(
        &self,
        congregation_id: Uuid,
        batch_id: Uuid,
    ) -> Result<(), BatchError> {
        let txn = self.db.begin().await?;

        let batch = batches::Entity::find_by_id(batch_id)
            .filter(batches::Column::CongregationId.eq(congregation_id))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(BatchError::NotFound(batch_id))?;

        if batch.attestation_started() {
            return Err(BatchError::AttestationStarted(batch_id));
        }

        batches::Entity::delete_by_id(batch.id).exec(&txn).await?;
        txn.commit().await?;
        Ok(())
    }
}

/// Maps a stored status to the domain status, folding legacy `closed`.
#[must_use]
pub fn db_status_to_core(status: &sea_orm_active_enums::BatchStatus) -> BatchStatus {
    match status {
        sea_orm_active_enums::BatchStatus::Open | sea_orm_active_enums::BatchStatus::Closed => {
            BatchStatus::Open
        }
        sea_orm_active_enums::BatchStatus::Finalized => BatchStatus::Finalized,
    }
}

/// Recomputes and writes back the cached total for a batch.
///
/// Must run inside the same transaction as the mutation that changed the
/// donation set.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn recompute_total<C: ConnectionTrait>(
    conn: &C,
    batch_id: Uuid,
) -> Result<Decimal, sea_orm::DbErr> {
    let lines = donations::Entity::find()
        .filter(donations::Column::BatchId.eq(batch_id))
        .all(conn)
        .await?;

    let total: Decimal = lines.iter().map(|d| d.amount).sum();

    batches::Entity::update_many()
        .filter(batches::Column::Id.eq(batch_id))
        .col_expr(batches::Column::TotalAmount, Expr::value(total))
        .col_expr(
            batches::Column::UpdatedAt,
            Expr::value(chrono::DateTime::<chrono::FixedOffset>::from(Utc::now())),
        )
        .exec(conn)
        .await?;

    Ok(total)
}
