//! Donation ledger routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, patch, post},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::routes::batches::{DonationResponse, check_congregation, internal_error_response};
use crate::{AppState, middleware::AuthUser};
use plately_core::ledger::DonationType;
use plately_db::repositories::{
    CreateDonationInput, DonationError, DonationRepository, UpdateDonationInput,
};

/// Creates the donation routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/congregations/{cong_id}/donations", post(create_donation))
        .route(
            "/congregations/{cong_id}/donations/{donation_id}",
            patch(update_donation),
        )
        .route(
            "/congregations/{cong_id}/donations/{donation_id}",
            delete(delete_donation),
        )
        .route(
            "/congregations/{cong_id}/donations/{donation_id}/move",
            post(move_donation),
        )
}

// ============================================================================
// Request Types
// ============================================================================

/// Request body for recording a donation.
#[derive(Debug, Deserialize)]
pub struct CreateDonationRequest {
    /// Batch to attach to, omitted for an unassigned donation.
    pub batch_id: Option<Uuid>,
    /// Contributor, omitted for anonymous.
    pub member_id: Option<Uuid>,
    /// Date received (YYYY-MM-DD).
    pub donation_date: NaiveDate,
    /// "cash" or "check".
    #[serde(rename = "type")]
    pub donation_type: String,
    /// Amount as a decimal string.
    pub amount: Decimal,
    /// Check number, required for checks.
    pub check_number: Option<String>,
    /// Notes.
    pub notes: Option<String>,
}

/// Request body for editing a donation.
#[derive(Debug, Deserialize)]
pub struct UpdateDonationRequest {
    /// New contributor. Explicit null detaches the member.
    #[serde(default, deserialize_with = "double_option")]
    pub member_id: Option<Option<Uuid>>,
    /// New date.
    pub donation_date: Option<NaiveDate>,
    /// New type.
    #[serde(rename = "type")]
    pub donation_type: Option<String>,
    /// New amount.
    pub amount: Option<Decimal>,
    /// New check number. Explicit null clears it.
    #[serde(default, deserialize_with = "double_option")]
    pub check_number: Option<Option<String>>,
    /// New notes. Explicit null clears them.
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

/// Request body for moving a donation between batches.
#[derive(Debug, Deserialize)]
pub struct MoveDonationRequest {
    /// Target batch, or null to detach.
    pub batch_id: Option<Uuid>,
}

fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(de).map(Some)
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/congregations/{cong_id}/donations` - Record a donation.
async fn create_donation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(cong_id): Path<Uuid>,
    Json(payload): Json<CreateDonationRequest>,
) -> impl IntoResponse {
    if let Err(response) = check_congregation(&auth, cong_id) {
        return response;
    }

    let Some(donation_type) = DonationType::parse(&payload.donation_type) else {
        return invalid_type_response();
    };

    let repo = DonationRepository::new((*state.db).clone());
    match repo
        .create(
            cong_id,
            CreateDonationInput {
                batch_id: payload.batch_id,
                member_id: payload.member_id,
                donation_date: payload.donation_date,
                donation_type,
                amount: payload.amount,
                check_number: payload.check_number,
                notes: payload.notes,
            },
        )
        .await
    {
        Ok(donation) => (
            StatusCode::CREATED,
            Json(json!({ "donation": DonationResponse::from_model(&donation) })),
        )
            .into_response(),
        Err(e) => donation_error_response(&e),
    }
}

/// PATCH `/congregations/{cong_id}/donations/{donation_id}` - Edit a donation.
async fn update_donation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((cong_id, donation_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateDonationRequest>,
) -> impl IntoResponse {
    if let Err(response) = check_congregation(&auth, cong_id) {
        return response;
    }

    let donation_type = match payload.donation_type.as_deref() {
        None => None,
        Some(raw) => match DonationType::parse(raw) {
            Some(t) => Some(t),
            None => return invalid_type_response(),
        },
    };

    let repo = DonationRepository::new((*state.db).clone());
    match repo
        .update(
            cong_id,
            donation_id,
            UpdateDonationInput {
                member_id: payload.member_id,
                donation_date: payload.donation_date,
                donation_type,
                amount: payload.amount,
                check_number: payload.check_number,
                notes: payload.notes,
            },
        )
        .await
    {
        Ok(donation) => (
            StatusCode::OK,
            Json(json!({ "donation": DonationResponse::from_model(&donation) })),
        )
            .into_response(),
        Err(e) => donation_error_response(&e),
    }
}

/// DELETE `/congregations/{cong_id}/donations/{donation_id}` - Remove a donation.
async fn delete_donation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((cong_id, donation_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    if let Err(response) = check_congregation(&auth, cong_id) {
        return response;
    }

    let repo = DonationRepository::new((*state.db).clone());
    match repo.delete(cong_id, donation_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => donation_error_response(&e),
    }
}

/// POST `/congregations/{cong_id}/donations/{donation_id}/move` - Reassign
/// a donation to another batch.
async fn move_donation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((cong_id, donation_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<MoveDonationRequest>,
) -> impl IntoResponse {
    if let Err(response) = check_congregation(&auth, cong_id) {
        return response;
    }

    let repo = DonationRepository::new((*state.db).clone());
    match repo
        .move_donation(cong_id, donation_id, payload.batch_id)
        .await
    {
        Ok(donation) => (
            StatusCode::OK,
            Json(json!({ "donation": DonationResponse::from_model(&donation) })),
        )
            .into_response(),
        Err(e) => donation_error_response(&e),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn invalid_type_response() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": "invalid_donation_type",
            "message": "Donation type must be 'cash' or 'check'"
        })),
    )
        .into_response()
}

fn donation_error_response(e: &DonationError) -> Response {
    match e {
        DonationError::NotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "donation_not_found",
                "message": "Donation not found"
            })),
        )
            .into_response(),
        DonationError::BatchNotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "batch_not_found",
                "message": "Batch not found"
            })),
        )
            .into_response(),
        DonationError::Invalid(err) => {
            let status = StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (
                status,
                Json(json!({
                    "error": err.error_code().to_lowercase(),
                    "message": err.to_string()
                })),
            )
                .into_response()
        }
        DonationError::Database(msg) => {
            error!(error = %msg, "Donation repository error");
            internal_error_response()
        }
    }
}
