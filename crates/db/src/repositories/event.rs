//! Batch event repository. Append-only audit trail.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entities::batch_events;

/// Repository for the batch audit trail.
#[derive(Debug, Clone)]
pub struct BatchEventRepository {
    db: DatabaseConnection,
}

impl BatchEventRepository {
    /// Creates a new batch event repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Appends an event row. Usable on a connection or inside a transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn append<C: ConnectionTrait>(
        conn: &C,
        batch_id: Uuid,
        event_type: &str,
        actor_id: Option<Uuid>,
        actor_name: Option<String>,
    ) -> Result<batch_events::Model, DbErr> {
        let event = batch_events::ActiveModel {
            id: Set(Uuid::new_v4()),
            batch_id: Set(batch_id),
            event_type: Set(event_type.to_string()),
            actor_id: Set(actor_id),
            actor_name: Set(actor_name),
            recorded_at: Set(Utc::now().into()),
        };
        event.insert(conn).await
    }

    /// Lists events for a batch in recorded order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn list_for_batch(&self, batch_id: Uuid) -> Result<Vec<batch_events::Model>, DbErr> {
        batch_events::Entity::find()
            .filter(batch_events::Column::BatchId.eq(batch_id))
            .order_by_asc(batch_events::Column::RecordedAt)
            .order_by_asc(batch_events::Column::Id)
            .all(&self.db)
            .await
    }
}
