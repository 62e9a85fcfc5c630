//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::auth::auth_middleware};

pub mod attestation;
pub mod batches;
pub mod donations;
pub mod health;

/// Creates the API router with protected routes behind the auth middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .merge(batches::routes())
        .merge(attestation::routes())
        .merge(donations::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new().merge(health::routes()).merge(protected_routes)
}
