//! Request middleware.

pub mod auth;

pub use auth::{AuthUser, Identity, auth_middleware};
