//! `SeaORM` Entity for members table.
//!
//! Members are a read-only contributor directory used for display joins.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "members")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub congregation_id: Uuid,
    pub display_name: String,
    pub envelope_number: Option<i32>,
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
    #[sea_orm(has_many = "super::donations::Entity")]
    Donations,
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

impl ActiveModelBehavior for ActiveModel {}
