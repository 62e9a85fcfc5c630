//! Bearer-token identity middleware for protected routes.
//!
//! Identity management itself lives outside this service; callers present
//! an opaque API token that maps to a user row.

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use uuid::Uuid;

use crate::AppState;
use plately_db::UserRepository;

/// The acting user, resolved from the presented API token.
#[derive(Debug, Clone)]
pub struct Identity {
    /// User ID.
    pub user_id: Uuid,
    /// Owning congregation.
    pub congregation_id: Uuid,
    /// Display name, used as the default signature name.
    pub display_name: String,
    /// Whether this user may serve as a secondary attestor.
    pub verified: bool,
}

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

/// Authentication middleware that resolves API tokens to identities.
///
/// This middleware:
/// 1. Extracts the Bearer token from the Authorization header
/// 2. Looks it up against the users table
/// 3. Stores the resulting `Identity` in request extensions for handlers
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(token) = auth_header.and_then(extract_bearer_token) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "missing_token",
                "message": "Authorization header with Bearer token is required"
            })),
        )
            .into_response();
    };

    let users = UserRepository::new((*state.db).clone());
    match users.find_by_api_token(token).await {
        Ok(Some(user)) => {
            request.extensions_mut().insert(Identity {
                user_id: user.id,
                congregation_id: user.congregation_id,
                display_name: user.display_name,
                verified: user.verified,
            });
            next.run(request).await
        }
        Ok(None) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "invalid_token",
                "message": "Unknown API token"
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to resolve API token");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "internal_error",
                    "message": "An error occurred"
                })),
            )
                .into_response()
        }
    }
}

/// Extractor for the authenticated identity.
///
/// Use this in handlers behind the auth middleware:
///
/// ```ignore
/// async fn handler(auth: AuthUser) -> impl IntoResponse {
///     let user_id = auth.user_id();
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl AuthUser {
    /// Returns the acting user's ID.
    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        self.0.user_id
    }

    /// Returns the acting user's congregation.
    #[must_use]
    pub const fn congregation_id(&self) -> Uuid {
        self.0.congregation_id
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Identity>().cloned().map(Self).ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "unauthorized",
                    "message": "Authentication required"
                })),
            )
                .into_response()
        })
    }
}
