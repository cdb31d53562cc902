//! # Submission API
//!
//! Public multipart ingestion of identity documents, plus the reviewer's
//! status update.

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use doclink_core::{Submission, SubmissionId, SubmissionStatus};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, SubmissionForm, Validate};
use crate::state::AppState;

/// Default request body limit for submissions. Three files at the 25 MiB
/// cap plus form overhead fit; the per-file limit is enforced by
/// classification.
pub const SUBMISSION_BODY_LIMIT: usize = 80 * 1024 * 1024;

/// A stored submission.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmissionResponse {
    pub id: Uuid,
    pub document_link_id: Uuid,
    pub token: String,
    pub id_type: Option<String>,
    pub id_picture_url: Option<String>,
    /// `image` or `document`.
    pub id_picture_category: Option<String>,
    pub selfie_url: Option<String>,
    pub selfie_category: Option<String>,
    pub address_proof_type: Option<String>,
    pub address_proof_picture_url: Option<String>,
    pub address_proof_picture_category: Option<String>,
    pub submitted_at: DateTime<Utc>,
    /// `submitted`, `approved` or `rejected`.
    pub status: String,
}

impl From<Submission> for SubmissionResponse {
    fn from(s: Submission) -> Self {
        Self {
            id: *s.id.as_uuid(),
            document_link_id: *s.document_link_id.as_uuid(),
            token: s.token.as_str().to_string(),
            id_type: s.id_type.map(|t| t.as_str().to_string()),
            id_picture_url: s.id_picture_url,
            id_picture_category: s.id_picture_category.map(|c| c.as_str().to_string()),
            selfie_url: s.selfie_url,
            selfie_category: s.selfie_category.map(|c| c.as_str().to_string()),
            address_proof_type: s.address_proof_type.map(|t| t.as_str().to_string()),
            address_proof_picture_url: s.address_proof_picture_url,
            address_proof_picture_category: s
                .address_proof_picture_category
                .map(|c| c.as_str().to_string()),
            submitted_at: s.submitted_at,
            status: s.status.as_str().to_string(),
        }
    }
}

/// Envelope returned on a committed submission.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitResponse {
    pub success: bool,
    pub data: SubmissionResponse,
}

/// Multipart form accepted by `POST /v1/submissions` (documentation only).
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct SubmissionUpload {
    token: String,
    /// passport, driving_license, national_id or residence_permit.
    id_type: Option<String>,
    #[schema(value_type = Option<String>, format = Binary)]
    id_file: Option<Vec<u8>>,
    #[schema(value_type = Option<String>, format = Binary)]
    selfie_file: Option<Vec<u8>>,
    /// utility_bill, bank_statement, rental_agreement or government_letter.
    address_proof_type: Option<String>,
    #[schema(value_type = Option<String>, format = Binary)]
    address_proof_file: Option<Vec<u8>>,
}

/// Reviewer status update.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// `submitted`, `approved` or `rejected`.
    pub status: String,
}

impl Validate for UpdateStatusRequest {
    fn validate(&self) -> Result<(), String> {
        self.status
            .parse::<SubmissionStatus>()
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Public submission routes. `body_limit` caps the whole multipart body.
pub fn public_router(body_limit: usize) -> Router<AppState> {
    Router::new().route(
        "/v1/submissions",
        post(create_submission).layer(DefaultBodyLimit::max(body_limit)),
    )
}

/// Reviewer routes (behind auth).
pub fn admin_router() -> Router<AppState> {
    Router::new().route("/v1/submissions/:id/status", put(update_status))
}

/// POST /v1/submissions: ingest one submission for a link token.
#[utoipa::path(
    post,
    path = "/v1/submissions",
    request_body(content = SubmissionUpload, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Submission stored", body = SubmitResponse),
        (status = 404, description = "Unknown token", body = crate::error::ErrorBody),
        (status = 409, description = "Token already used", body = crate::error::ErrorBody),
        (status = 413, description = "File or request body too large", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid token, file or multipart body", body = crate::error::ErrorBody),
        (status = 502, description = "Upload failed", body = crate::error::ErrorBody),
        (status = 503, description = "Storage not configured", body = crate::error::ErrorBody),
    ),
    tag = "submissions"
)]
async fn create_submission(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let Some(pipeline) = state.pipeline.as_ref() else {
        return Err(AppError::service_unavailable(
            "document storage is not configured",
        ));
    };

    let result = async {
        let form = SubmissionForm::from_multipart(multipart).await?;
        let (token, payloads) = form.into_payloads()?;
        pipeline.ingest(&token, payloads).await.map_err(AppError::from)
    }
    .await;

    match result {
        Ok(submission) => {
            state.metrics.record_ingestion("committed");
            Ok((
                StatusCode::CREATED,
                Json(SubmitResponse {
                    success: true,
                    data: submission.into(),
                }),
            ))
        }
        Err(err) => {
            state.metrics.record_ingestion(&outcome_label(&err));
            Err(err)
        }
    }
}

/// Metric label for a failed ingestion.
fn outcome_label(err: &AppError) -> String {
    match err {
        AppError::Ingestion(e) => e.kind.code().to_ascii_lowercase(),
        _ => "malformed_request".to_string(),
    }
}

/// PUT /v1/submissions/:id/status: set the review status.
#[utoipa::path(
    put,
    path = "/v1/submissions/{id}/status",
    params(("id" = Uuid, Path, description = "Submission ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = SubmissionResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 422, description = "Unknown status", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "submissions"
)]
async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let status: SubmissionStatus = req.status.parse()?;

    let updated = state
        .submissions
        .update_status(SubmissionId::from_uuid(id), status)
        .await?
        .ok_or_else(|| AppError::not_found(format!("submission {id} not found")))?;

    tracing::info!(submission_id = %id, status = status.as_str(), "submission status updated");
    Ok(Json(updated.into()))
}
