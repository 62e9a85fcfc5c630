//! `SeaORM` entity definitions.

pub mod batch_events;
pub mod batches;
pub mod congregations;
pub mod donations;
pub mod members;
pub mod sea_orm_active_enums;
pub mod users;
