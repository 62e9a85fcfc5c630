//! Member repository. Read-only name lookups for display joins.

use std::collections::HashMap;

use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::entities::members;

/// Repository for the contributor directory.
#[derive(Debug, Clone)]
pub struct MemberRepository {
    db: DatabaseConnection,
}

impl MemberRepository {
    /// Creates a new member repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists all members of a congregation, sorted by display name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn list(&self, congregation_id: Uuid) -> Result<Vec<members::Model>, DbErr> {
        members::Entity::find()
            .filter(members::Column::CongregationId.eq(congregation_id))
            .order_by_asc(members::Column::DisplayName)
            .all(&self.db)
            .await
    }

    /// Resolves member ids to display names for report rendering.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn display_names(
        &self,
        congregation_id: Uuid,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, String>, DbErr> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = members::Entity::find()
            .filter(members::Column::CongregationId.eq(congregation_id))
            .filter(members::Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(|m| (m.id, m.display_name)).collect())
    }
}
