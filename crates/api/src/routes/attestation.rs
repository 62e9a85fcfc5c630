//! Attestation routes and the finalization coordinator.
//!
//! The three transition endpoints delegate state logic to the repository.
//! `confirm-attestation` additionally coordinates the post-finalize side
//! effects: at most once per batch it builds the count report, emails it
//! to the configured recipients, and records the dispatch outcome in the
//! audit trail. Dispatch is best-effort and never rolls back a finalize.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::routes::batches::{
    BatchResponse, attestation_error_response, build_count_report, check_congregation,
};
use crate::{AppState, middleware::AuthUser};
use plately_core::report::ReportService;
use plately_db::entities::congregations;
use plately_db::repositories::{AttestationRepository, BatchEventRepository, BatchRepository};
use sea_orm::EntityTrait;

/// Creates the attestation routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/congregations/{cong_id}/batches/{batch_id}/attest-primary",
            post(attest_primary),
        )
        .route(
            "/congregations/{cong_id}/batches/{batch_id}/attest-secondary",
            post(attest_secondary),
        )
        .route(
            "/congregations/{cong_id}/batches/{batch_id}/confirm-attestation",
            post(confirm_attestation),
        )
}

/// Request body for the two attest endpoints.
#[derive(Debug, Deserialize)]
pub struct AttestRequest {
    /// Name to record as the signature. Defaults to the acting user's
    /// display name when omitted.
    pub signature_name: Option<String>,
}

/// POST `.../attest-primary` - First counter signs the count.
async fn attest_primary(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((cong_id, batch_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<AttestRequest>,
) -> impl IntoResponse {
    if let Err(response) = check_congregation(&auth, cong_id) {
        return response;
    }

    let signature_name = payload
        .signature_name
        .unwrap_or_else(|| auth.0.display_name.clone());
    let repo = AttestationRepository::new((*state.db).clone());
    match repo
        .attest_primary(cong_id, batch_id, auth.user_id(), &signature_name)
        .await
    {
        Ok(batch) => {
            info!(batch_id = %batch_id, attestor = %auth.user_id(), "Primary attestation recorded");
            batch_response(StatusCode::OK, &batch)
        }
        Err(e) => attestation_error_response(&e),
    }
}

/// POST `.../attest-secondary` - Second counter signs the count.
async fn attest_secondary(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((cong_id, batch_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<AttestRequest>,
) -> impl IntoResponse {
    if let Err(response) = check_congregation(&auth, cong_id) {
        return response;
    }

    let signature_name = payload
        .signature_name
        .unwrap_or_else(|| auth.0.display_name.clone());
    let repo = AttestationRepository::new((*state.db).clone());
    match repo
        .attest_secondary(
            cong_id,
            batch_id,
            auth.user_id(),
            auth.0.verified,
            &signature_name,
        )
        .await
    {
        Ok(batch) => {
            info!(batch_id = %batch_id, attestor = %auth.user_id(), "Secondary attestation recorded");
            batch_response(StatusCode::OK, &batch)
        }
        Err(e) => attestation_error_response(&e),
    }
}

/// POST `.../confirm-attestation` - Finalize the count. Idempotent.
async fn confirm_attestation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((cong_id, batch_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    if let Err(response) = check_congregation(&auth, cong_id) {
        return response;
    }

    let repo = AttestationRepository::new((*state.db).clone());
    let result = match repo
        .confirm_finalization(cong_id, batch_id, auth.user_id(), &auth.0.display_name)
        .await
    {
        Ok(result) => result,
        Err(e) => return attestation_error_response(&e),
    };

    // Dispatch fires only for the call that performed the transition, so
    // a confirm retry never re-sends the report.
    let report_dispatched = if result.caused_transition {
        info!(batch_id = %batch_id, confirmed_by = %auth.user_id(), "Batch finalized");
        dispatch_report(&state, cong_id, batch_id, auth.user_id()).await
    } else {
        false
    };

    let batch = match BatchResponse::from_model(&result.batch) {
        Ok(batch) => batch,
        Err(e) => return attestation_error_response(&e),
    };
    (
        StatusCode::OK,
        Json(json!({
            "batch": batch,
            "finalized": true,
            "caused_transition": result.caused_transition,
            "report_dispatched": report_dispatched,
        })),
    )
        .into_response()
}

/// Builds and emails the count report. Best-effort: every failure path
/// logs, records an audit event, and returns false.
async fn dispatch_report(
    state: &AppState,
    cong_id: Uuid,
    batch_id: Uuid,
    actor_id: Uuid,
) -> bool {
    let dispatched = try_dispatch_report(state, cong_id, batch_id).await;

    let event_type = if dispatched {
        "report_dispatched"
    } else {
        "report_dispatch_failed"
    };
    if let Err(e) =
        BatchEventRepository::append(state.db.as_ref(), batch_id, event_type, Some(actor_id), None)
            .await
    {
        warn!(batch_id = %batch_id, error = %e, "Failed to record report dispatch event");
    }

    dispatched
}

async fn try_dispatch_report(state: &AppState, cong_id: Uuid, batch_id: Uuid) -> bool {
    let recipients = match congregations::Entity::find_by_id(cong_id)
        .one(state.db.as_ref())
        .await
    {
        Ok(Some(congregation)) => congregation.recipient_list(),
        Ok(None) => {
            warn!(batch_id = %batch_id, "Congregation vanished before report dispatch");
            return false;
        }
        Err(e) => {
            warn!(batch_id = %batch_id, error = %e, "Failed to load congregation for report dispatch");
            return false;
        }
    };
    if recipients.is_empty() {
        warn!(batch_id = %batch_id, "No report recipients configured; skipping dispatch");
        return false;
    }

    let snapshot = match BatchRepository::new((*state.db).clone())
        .get_with_donations(cong_id, batch_id)
        .await
    {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(batch_id = %batch_id, error = %e, "Failed to load batch for report dispatch");
            return false;
        }
    };
    let report = match build_count_report(state, cong_id, &snapshot).await {
        Ok(report) => report,
        Err(_) => {
            warn!(batch_id = %batch_id, "Failed to build count report for dispatch");
            return false;
        }
    };

    let subject = format!(
        "Offering count report: {} {}",
        report.service_name, report.service_date
    );
    let body = ReportService::to_email_body(&report);
    let csv = ReportService::to_csv(&report);
    let filename = ReportService::csv_filename(&report);

    let mut all_sent = true;
    for recipient in &recipients {
        if let Err(e) = state
            .email_service
            .send_count_report(recipient, &subject, &body, &filename, &csv)
            .await
        {
            warn!(batch_id = %batch_id, recipient = %recipient, error = %e, "Report dispatch failed");
            all_sent = false;
        }
    }
    if all_sent {
        info!(batch_id = %batch_id, recipients = recipients.len(), "Count report dispatched");
    }
    all_sent
}

fn batch_response(status: StatusCode, batch: &plately_db::entities::batches::Model) -> Response {
    match BatchResponse::from_model(batch) {
        Ok(response) => (status, Json(json!({ "batch": response }))).into_response(),
        Err(e) => attestation_error_response(&e),
    }
}
