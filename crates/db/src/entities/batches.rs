//! `SeaORM` Entity for batches table.
//!
//! A batch is one offering count: the donations collected at a single
//! service, counted and attested by two people before finalization.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::BatchStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "batches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub congregation_id: Uuid,
    pub service_name: String,
    pub service_date: Date,
    pub notes: Option<String>,
    pub status: BatchStatus,
    /// Cached sum of attached donation amounts, maintained by repositories.
    pub total_amount: Decimal,
    pub primary_attestor_id: Option<Uuid>,
    pub primary_attestor_name: Option<String>,
    pub primary_attested_at: Option<DateTimeWithTimeZone>,
    pub secondary_attestor_id: Option<Uuid>,
    pub secondary_attestor_name: Option<String>,
    pub secondary_attested_at: Option<DateTimeWithTimeZone>,
    pub attestation_confirmed_at: Option<DateTimeWithTimeZone>,
    pub created_by: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::congregations::Entity",
        from = "Column::CongregationId",
        to = "super::congregations::Column::Id"
    )]
    Congregations,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::CreatedBy",
        to = "super::users::Column::Id"
    )]
    Users,
    #[sea_orm(has_many = "super::donations::Entity")]
    Donations,
    #[sea_orm(has_many = "super::batch_events::Entity")]
    BatchEvents,
}

impl Related<super::congregations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Congregations.def()
    }
}

impl Related<super::donations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Donations.def()
    }
}

impl Related<super::batch_events::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BatchEvents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether any attestor has signed this batch yet.
    #[must_use]
    pub const fn attestation_started(&self) -> bool {
        self.primary_attestor_id.is_some()
    }
}
