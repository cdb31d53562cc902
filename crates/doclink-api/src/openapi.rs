//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the admin bearer token scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "Static admin token. Set via the AUTH_TOKEN env var.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "doclink API",
        version = "0.1.0",
        description = "Tokenized identity-document collection.\n\nRecipients open a link carrying a token and upload an ID document, a selfie and a proof of address; each token accepts exactly one submission. Reviewers manage links and review submissions with a bearer token.\n\nPublic: `/v1/submissions`, `/v1/verify/{token}`, `/health/*`. Everything else under `/v1` requires `Authorization: Bearer <token>`."
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        crate::routes::submissions::create_submission,
        crate::routes::submissions::update_status,
        crate::routes::verify::verify_link,
        crate::routes::links::create_link,
        crate::routes::links::list_links,
        crate::routes::links::delete_link,
        crate::routes::uploads::sign_upload,
    ),
    components(
        schemas(
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
            crate::routes::submissions::SubmissionResponse,
            crate::routes::submissions::SubmitResponse,
            crate::routes::submissions::SubmissionUpload,
            crate::routes::submissions::UpdateStatusRequest,
            crate::routes::links::CreateLinkRequest,
            crate::routes::links::LinkResponse,
            crate::routes::links::LinkPageResponse,
            crate::routes::uploads::UploadSignatureRequest,
            crate::routes::uploads::UploadSignatureResponse,
        ),
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "submissions", description = "Document submission ingestion and review status"),
        (name = "verify", description = "Recipient link lookup"),
        (name = "links", description = "Document link administration"),
        (name = "uploads", description = "Direct-upload signatures"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: the generated OpenAPI document.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
