//! # Direct Upload Signatures
//!
//! Signs a browser-side upload into the folder owned by a link token, so a
//! client can push files straight to object storage.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use doclink_core::{DirectUploadSignature, Token};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

/// Request a signature for the folder of `token`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UploadSignatureRequest {
    pub token: String,
}

impl Validate for UploadSignatureRequest {
    fn validate(&self) -> Result<(), String> {
        Token::parse(&self.token)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Parameters the client sends along with its upload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadSignatureResponse {
    pub signature: String,
    pub timestamp: i64,
    pub folder: String,
    pub cloud_name: String,
    pub api_key: String,
}

impl From<DirectUploadSignature> for UploadSignatureResponse {
    fn from(sig: DirectUploadSignature) -> Self {
        Self {
            signature: sig.signature,
            timestamp: sig.timestamp,
            folder: sig.folder,
            cloud_name: sig.cloud_name,
            api_key: sig.api_key,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/uploads/signature", post(sign_upload))
}

/// POST /v1/uploads/signature: sign a direct upload for a link's folder.
#[utoipa::path(
    post,
    path = "/v1/uploads/signature",
    request_body = UploadSignatureRequest,
    responses(
        (status = 200, description = "Signature issued", body = UploadSignatureResponse),
        (status = 404, description = "Unknown token", body = crate::error::ErrorBody),
        (status = 503, description = "Storage not configured", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "uploads"
)]
async fn sign_upload(
    State(state): State<AppState>,
    body: Result<Json<UploadSignatureRequest>, JsonRejection>,
) -> Result<Json<UploadSignatureResponse>, AppError> {
    let Some(storage) = state.storage.as_ref() else {
        return Err(AppError::service_unavailable(
            "document storage is not configured",
        ));
    };
    let req = extract_validated_json(body)?;
    let token = Token::parse(&req.token)?;

    if state.links.get_link_by_token(&token).await?.is_none() {
        return Err(AppError::not_found("link not found"));
    }

    let signature = storage.sign_direct_upload(token.as_str())?;
    tracing::debug!(token = %token.redacted(), "direct upload signature issued");
    Ok(Json(signature.into()))
}
