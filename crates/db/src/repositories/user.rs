//! User repository. Identity lookup for the bearer-token middleware.

use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::entities::users;

/// Repository for acting-user identities.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    /// Creates a new user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Looks up the user presenting an API token.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn find_by_api_token(&self, token: &str) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find()
            .filter(users::Column::ApiToken.eq(token))
            .one(&self.db)
            .await
    }

    /// Fetches a user by id within a congregation.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn find_by_id(
        &self,
        congregation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find_by_id(user_id)
            .filter(users::Column::CongregationId.eq(congregation_id))
            .one(&self.db)
            .await
    }
}
