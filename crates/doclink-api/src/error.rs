//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps ingestion, store and storage errors to HTTP status codes with a
//! JSON body carrying a machine-readable code. Internal and upstream
//! messages are logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use doclink_core::{IngestionError, IngestionErrorKind, StorageError, StoreError, ValidationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "DUPLICATE_SUBMISSION").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Failure context. Ingestion errors always carry `step`, plus `slot`
    /// or `field` when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (422).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict with current resource state (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),

    /// Object storage returned an error or is unreachable (502).
    #[error("upstream storage error: {0}")]
    UpstreamError(String),

    /// Service dependency not configured or unhealthy (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Submission ingestion failed; status depends on the kind.
    #[error("ingestion failed at {0}")]
    Ingestion(IngestionError),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BAD_REQUEST"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::UpstreamError(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            Self::Ingestion(err) => (ingestion_status(&err.kind), err.kind.code()),
        }
    }

    /// Construct a service unavailable error (503).
    pub fn service_unavailable(msg: &str) -> Self {
        Self::ServiceUnavailable(msg.to_string())
    }

    /// Construct a not-found error (404).
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Client-facing message. Internal and upstream detail is replaced.
    fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::UpstreamError(_) => "An upstream service error occurred".to_string(),
            Self::Ingestion(err) => match &err.kind {
                IngestionErrorKind::Upload { slot } => {
                    format!("Failed to upload {slot} document")
                }
                IngestionErrorKind::Persistence { .. } => "Failed to save submission".to_string(),
                IngestionErrorKind::StoreUnavailable => {
                    "Submission service is temporarily unavailable".to_string()
                }
                _ => err.detail.clone(),
            },
            other => other.to_string(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        let Self::Ingestion(err) = self else {
            return None;
        };
        let mut details = serde_json::Map::new();
        details.insert("step".into(), err.step.as_str().into());
        if let Some(slot) = err.slot {
            details.insert("slot".into(), slot.as_str().into());
        }
        if let Some(field) = err.field() {
            details.insert("field".into(), field.into());
        }
        Some(serde_json::Value::Object(details))
    }
}

fn ingestion_status(kind: &IngestionErrorKind) -> StatusCode {
    match kind {
        IngestionErrorKind::Validation
        | IngestionErrorKind::UnsupportedType
        | IngestionErrorKind::InvalidSlotType => StatusCode::UNPROCESSABLE_ENTITY,
        IngestionErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        IngestionErrorKind::NotFound => StatusCode::NOT_FOUND,
        IngestionErrorKind::DuplicateSubmission => StatusCode::CONFLICT,
        IngestionErrorKind::Upload { .. } => StatusCode::BAD_GATEWAY,
        IngestionErrorKind::Persistence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        IngestionErrorKind::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Log server-side errors for operator visibility.
        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::UpstreamError(_) => tracing::error!(error = %self, "upstream storage error"),
            Self::ServiceUnavailable(_) => tracing::warn!(error = %self, "service unavailable"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.public_message(),
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<IngestionError> for AppError {
    fn from(err: IngestionError) -> Self {
        Self::Ingestion(err)
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => Self::Conflict("record already exists".to_string()),
            StoreError::Field { .. } | StoreError::Backend(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        Self::UpstreamError(err.to_string())
    }
}
