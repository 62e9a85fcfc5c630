//! Batch (offering count) management routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::{AppState, middleware::AuthUser};
use plately_core::attestation::AttestationError;
use plately_core::batch::{self, BatchStatus, BatchTotals};
use plately_core::ledger::{DonationLine, DonationType};
use plately_core::report::{CountReportInput, ReportAttestation, ReportLine, ReportService};
use plately_db::entities::{batches, congregations, donations};
use plately_db::repositories::{
    AttestationRepository, BatchError, BatchFilter, BatchRepository, BatchSnapshot,
    CreateBatchInput, MemberRepository, UpdateBatchInput,
};
use sea_orm::EntityTrait;

/// Creates the batch routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/congregations/{cong_id}/batches", post(create_batch))
        .route("/congregations/{cong_id}/batches", get(list_batches))
        .route("/congregations/{cong_id}/batches/{batch_id}", get(get_batch))
        .route("/congregations/{cong_id}/batches/{batch_id}", patch(update_batch))
        .route("/congregations/{cong_id}/batches/{batch_id}", delete(delete_batch))
        .route("/congregations/{cong_id}/batches/{batch_id}/report", get(get_report))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing batches.
#[derive(Debug, Deserialize)]
pub struct ListBatchesQuery {
    /// Filter by status ("open" or "finalized").
    pub status: Option<String>,
    /// Earliest service date (YYYY-MM-DD).
    pub from: Option<NaiveDate>,
    /// Latest service date (YYYY-MM-DD).
    pub to: Option<NaiveDate>,
}

/// Request body for creating a batch.
#[derive(Debug, Deserialize)]
pub struct CreateBatchRequest {
    /// Service name ("Sunday Morning").
    pub service_name: String,
    /// Service date (YYYY-MM-DD).
    pub service_date: NaiveDate,
    /// Optional notes.
    pub notes: Option<String>,
}

/// Request body for updating batch details.
#[derive(Debug, Deserialize)]
pub struct UpdateBatchRequest {
    /// New service name.
    pub service_name: Option<String>,
    /// New service date.
    pub service_date: Option<NaiveDate>,
    /// New notes. Absent leaves them unchanged, explicit null clears.
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

/// Distinguishes an absent field from an explicit null.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(de).map(Some)
}

/// Response for a batch.
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    /// Batch ID.
    pub id: Uuid,
    /// Display name derived from service and date.
    pub display_name: String,
    /// Service name.
    pub service_name: String,
    /// Service date.
    pub service_date: String,
    /// Notes.
    pub notes: Option<String>,
    /// Domain status: "open" or "finalized".
    pub status: String,
    /// Attestation stage.
    pub attestation_stage: String,
    /// Cached total amount.
    pub total_amount: String,
    /// Primary attestor signature name.
    pub primary_attestor_name: Option<String>,
    /// When the primary attested.
    pub primary_attested_at: Option<String>,
    /// Secondary attestor signature name.
    pub secondary_attestor_name: Option<String>,
    /// When the secondary attested.
    pub secondary_attested_at: Option<String>,
    /// When finalization was confirmed.
    pub attestation_confirmed_at: Option<String>,
    /// Created at timestamp.
    pub created_at: String,
    /// Updated at timestamp.
    pub updated_at: String,
}

/// Response for a donation line.
#[derive(Debug, Serialize)]
pub struct DonationResponse {
    /// Donation ID.
    pub id: Uuid,
    /// Owning batch, if assigned.
    pub batch_id: Option<Uuid>,
    /// Contributor, if known.
    pub member_id: Option<Uuid>,
    /// Date received.
    pub donation_date: String,
    /// "cash" or "check".
    #[serde(rename = "type")]
    pub donation_type: String,
    /// Amount.
    pub amount: String,
    /// Check number for checks.
    pub check_number: Option<String>,
    /// Notes.
    pub notes: Option<String>,
}

impl BatchResponse {
    pub(crate) fn from_model(batch: &batches::Model) -> Result<Self, AttestationError> {
        let state = AttestationRepository::state_of(batch)?;
        Ok(Self {
            id: batch.id,
            display_name: batch::display_name(&batch.service_name, batch.service_date),
            service_name: batch.service_name.clone(),
            service_date: batch.service_date.to_string(),
            notes: batch.notes.clone(),
            status: plately_db::repositories::batch::db_status_to_core(&batch.status)
                .as_str()
                .to_string(),
            attestation_stage: state.stage().as_str().to_string(),
            total_amount: batch.total_amount.to_string(),
            primary_attestor_name: batch.primary_attestor_name.clone(),
            primary_attested_at: batch.primary_attested_at.map(|t| t.to_rfc3339()),
            secondary_attestor_name: batch.secondary_attestor_name.clone(),
            secondary_attested_at: batch.secondary_attested_at.map(|t| t.to_rfc3339()),
            attestation_confirmed_at: batch.attestation_confirmed_at.map(|t| t.to_rfc3339()),
            created_at: batch.created_at.to_rfc3339(),
            updated_at: batch.updated_at.to_rfc3339(),
        })
    }
}

impl DonationResponse {
    pub(crate) fn from_model(donation: &donations::Model) -> Self {
        Self {
            id: donation.id,
            batch_id: donation.batch_id,
            member_id: donation.member_id,
            donation_date: donation.donation_date.to_string(),
            donation_type: donation.donation_type.as_str().to_string(),
            amount: donation.amount.to_string(),
            check_number: donation.check_number.clone(),
            notes: donation.notes.clone(),
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/congregations/{cong_id}/batches` - Create an open count.
async fn create_batch(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(cong_id): Path<Uuid>,
    Json(payload): Json<CreateBatchRequest>,
) -> impl IntoResponse {
    if let Err(response) = check_congregation(&auth, cong_id) {
        return response;
    }
    if payload.service_name.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_service_name",
                "message": "Service name must not be empty"
            })),
        )
            .into_response();
    }

    let repo = BatchRepository::new((*state.db).clone());
    match repo
        .create(
            cong_id,
            auth.user_id(),
            CreateBatchInput {
                service_name: payload.service_name.trim().to_string(),
                service_date: payload.service_date,
                notes: payload.notes,
            },
        )
        .await
    {
        Ok(batch) => batch_json(StatusCode::CREATED, &batch),
        Err(e) => batch_error_response(&e),
    }
}

/// GET `/congregations/{cong_id}/batches` - List counts.
async fn list_batches(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(cong_id): Path<Uuid>,
    Query(query): Query<ListBatchesQuery>,
) -> impl IntoResponse {
    if let Err(response) = check_congregation(&auth, cong_id) {
        return response;
    }

    let status = match query.status.as_deref() {
        None => None,
        Some(s) => match BatchStatus::parse(s) {
            Some(status) => Some(status),
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": "invalid_status",
                        "message": "Status must be 'open' or 'finalized'"
                    })),
                )
                    .into_response();
            }
        },
    };

    let repo = BatchRepository::new((*state.db).clone());
    match repo
        .list(
            cong_id,
            BatchFilter {
                status,
                from_date: query.from,
                to_date: query.to,
            },
        )
        .await
    {
        Ok(batches) => {
            let mut items = Vec::with_capacity(batches.len());
            for batch in &batches {
                match BatchResponse::from_model(batch) {
                    Ok(item) => items.push(item),
                    Err(e) => return attestation_error_response(&e),
                }
            }
            (StatusCode::OK, Json(json!({ "batches": items }))).into_response()
        }
        Err(e) => batch_error_response(&e),
    }
}

/// GET `/congregations/{cong_id}/batches/{batch_id}` - Batch with donations.
///
/// This is the endpoint counting teams poll while both people work, so the
/// partition is recomputed server-side from the donation rows and the
/// response is marked uncacheable.
async fn get_batch(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((cong_id, batch_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    if let Err(response) = check_congregation(&auth, cong_id) {
        return response;
    }

    let repo = BatchRepository::new((*state.db).clone());
    let snapshot = match repo.get_with_donations(cong_id, batch_id).await {
        Ok(snapshot) => snapshot,
        Err(e) => return batch_error_response(&e),
    };

    let batch = match BatchResponse::from_model(&snapshot.batch) {
        Ok(batch) => batch,
        Err(e) => return attestation_error_response(&e),
    };
    let lines: Vec<DonationLine> = snapshot
        .donations
        .iter()
        .map(|d| DonationLine {
            donation_type: match d.donation_type {
                plately_db::entities::sea_orm_active_enums::DonationType::Cash => {
                    DonationType::Cash
                }
                plately_db::entities::sea_orm_active_enums::DonationType::Check => {
                    DonationType::Check
                }
            },
            amount: d.amount,
        })
        .collect();
    let partition = BatchTotals::partition(&lines);
    let donations: Vec<DonationResponse> = snapshot
        .donations
        .iter()
        .map(DonationResponse::from_model)
        .collect();

    (
        StatusCode::OK,
        [(header::CACHE_CONTROL, "no-store")],
        Json(json!({
            "batch": batch,
            "donations": donations,
            "cash_total": partition.cash_total.to_string(),
            "check_total": partition.check_total.to_string(),
            "total": partition.total().to_string(),
        })),
    )
        .into_response()
}

/// PATCH `/congregations/{cong_id}/batches/{batch_id}` - Edit details.
async fn update_batch(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((cong_id, batch_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateBatchRequest>,
) -> impl IntoResponse {
    if let Err(response) = check_congregation(&auth, cong_id) {
        return response;
    }

    let repo = BatchRepository::new((*state.db).clone());
    match repo
        .update_details(
            cong_id,
            batch_id,
            UpdateBatchInput {
                service_name: payload.service_name,
                service_date: payload.service_date,
                notes: payload.notes,
            },
        )
        .await
    {
        Ok(batch) => batch_json(StatusCode::OK, &batch),
        Err(e) => batch_error_response(&e),
    }
}

/// DELETE `/congregations/{cong_id}/batches/{batch_id}` - Delete a count.
async fn delete_batch(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((cong_id, batch_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    if let Err(response) = check_congregation(&auth, cong_id) {
        return response;
    }

    let repo = BatchRepository::new((*state.db).clone());
    match repo.delete(cong_id, batch_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => batch_error_response(&e),
    }
}

/// GET `/congregations/{cong_id}/batches/{batch_id}/report` - CSV export.
///
/// Available on demand after finalization, repeatable.
async fn get_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((cong_id, batch_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    if let Err(response) = check_congregation(&auth, cong_id) {
        return response;
    }

    let repo = BatchRepository::new((*state.db).clone());
    let snapshot = match repo.get_with_donations(cong_id, batch_id).await {
        Ok(snapshot) => snapshot,
        Err(e) => return batch_error_response(&e),
    };

    let report = match build_count_report(&state, cong_id, &snapshot).await {
        Ok(report) => report,
        Err(response) => return response,
    };

    let csv = ReportService::to_csv(&report);
    let filename = ReportService::csv_filename(&report);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        csv,
    )
        .into_response()
}

// ============================================================================
// Helpers
// ============================================================================

/// Rejects requests whose path congregation does not match the identity.
pub(crate) fn check_congregation(auth: &AuthUser, cong_id: Uuid) -> Result<(), Response> {
    if auth.congregation_id() == cong_id {
        Ok(())
    } else {
        Err((
            StatusCode::FORBIDDEN,
            Json(json!({
                "error": "forbidden",
                "message": "Not a member of this congregation"
            })),
        )
            .into_response())
    }
}

/// Assembles the count report for a finalized batch snapshot.
///
/// Returns an error response when the batch is not finalized or a lookup
/// fails.
pub(crate) async fn build_count_report(
    state: &AppState,
    cong_id: Uuid,
    snapshot: &BatchSnapshot,
) -> Result<plately_core::report::CountReport, Response> {
    let batch = &snapshot.batch;
    let attestation = match AttestationRepository::state_of(batch) {
        Ok(state) => state,
        Err(e) => return Err(attestation_error_response(&e)),
    };
    let plately_core::attestation::AttestationState::Finalized {
        primary,
        secondary,
        confirmed_at,
    } = attestation
    else {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "error": "batch_not_finalized",
                "message": "Reports are only available for finalized batches"
            })),
        )
            .into_response());
    };

    let congregation = match congregations::Entity::find_by_id(cong_id)
        .one(state.db.as_ref())
        .await
    {
        Ok(Some(c)) => c,
        Ok(None) => {
            return Err((
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": "congregation_not_found",
                    "message": "Congregation not found"
                })),
            )
                .into_response());
        }
        Err(e) => {
            error!(error = %e, "Failed to load congregation");
            return Err(internal_error_response());
        }
    };

    let member_ids: Vec<Uuid> = snapshot.donations.iter().filter_map(|d| d.member_id).collect();
    let member_names = match MemberRepository::new((*state.db).clone())
        .display_names(cong_id, &member_ids)
        .await
    {
        Ok(names) => names,
        Err(e) => {
            error!(error = %e, "Failed to load member names");
            return Err(internal_error_response());
        }
    };

    let lines: Vec<ReportLine> = snapshot
        .donations
        .iter()
        .map(|d| ReportLine {
            donation_id: d.id,
            donation_date: d.donation_date,
            donor_name: d
                .member_id
                .and_then(|id| member_names.get(&id).cloned())
                .unwrap_or_else(|| "Anonymous".to_string()),
            donation_type: d.donation_type.as_str().to_string(),
            check_number: d.check_number.clone(),
            amount: d.amount,
            notes: d.notes.clone(),
        })
        .collect();

    let Some(primary_attested_at) = batch.primary_attested_at else {
        return Err(internal_error_response());
    };
    let Some(secondary_attested_at) = batch.secondary_attested_at else {
        return Err(internal_error_response());
    };

    Ok(ReportService::generate_count_report(CountReportInput {
        batch_id: batch.id,
        service_name: batch.service_name.clone(),
        service_date: batch.service_date,
        congregation_name: congregation.name,
        lines,
        primary_attestation: ReportAttestation {
            signature_name: primary.name,
            attested_at: primary_attested_at.into(),
        },
        secondary_attestation: ReportAttestation {
            signature_name: secondary.name,
            attested_at: secondary_attested_at.into(),
        },
        finalized_at: confirmed_at,
    }))
}

fn batch_json(status: StatusCode, batch: &batches::Model) -> Response {
    match BatchResponse::from_model(batch) {
        Ok(response) => (status, Json(json!({ "batch": response }))).into_response(),
        Err(e) => attestation_error_response(&e),
    }
}

pub(crate) fn batch_error_response(e: &BatchError) -> Response {
    match e {
        BatchError::NotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "batch_not_found",
                "message": "Batch not found"
            })),
        )
            .into_response(),
        BatchError::AttestationStarted(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "error": "attestation_started",
                "message": "Batch details are locked once attestation has begun"
            })),
        )
            .into_response(),
        BatchError::Database(msg) => {
            error!(error = %msg, "Batch repository error");
            internal_error_response()
        }
    }
}

pub(crate) fn attestation_error_response(e: &AttestationError) -> Response {
    if let AttestationError::Database(msg) = e {
        error!(error = %msg, "Attestation repository error");
        return internal_error_response();
    }
    if let AttestationError::CorruptAttestation { detail } = e {
        error!(detail = %detail, "Corrupt attestation state");
    }
    let status =
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(json!({
            "error": e.error_code().to_lowercase(),
            "message": e.to_string()
        })),
    )
        .into_response()
}

pub(crate) fn internal_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "internal_error",
            "message": "An error occurred"
        })),
    )
        .into_response()
}
