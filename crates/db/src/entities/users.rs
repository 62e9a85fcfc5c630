//! `SeaORM` Entity for users table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub congregation_id: Uuid,
    pub display_name: String,
    pub email: String,
    /// Bearer token presented by API clients. Never serialized in responses.
    #[serde(skip_serializing)]
    pub api_token: String,
    /// Whether this user may act as a secondary attestor.
    pub verified: bool,
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
}

impl Related<super::congregations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Congregations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
