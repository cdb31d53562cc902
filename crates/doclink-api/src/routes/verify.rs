//! # Recipient Verification Page API
//!
//! Public lookup used by the page a recipient opens from their link: which
//! documents are requested, and whether they already submitted.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use doclink_core::Token;

use crate::error::AppError;
use crate::routes::links::LinkResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/verify/:token", get(verify_link))
}

/// GET /v1/verify/:token: link details plus any existing submission.
#[utoipa::path(
    get,
    path = "/v1/verify/{token}",
    params(("token" = String, Path, description = "Link token")),
    responses(
        (status = 200, description = "Link found", body = LinkResponse),
        (status = 404, description = "Unknown token", body = crate::error::ErrorBody),
        (status = 422, description = "Malformed token", body = crate::error::ErrorBody),
    ),
    tag = "verify"
)]
async fn verify_link(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<LinkResponse>, AppError> {
    let token = Token::parse(&raw)?;
    let found = state
        .links
        .get_link_with_submission(&token)
        .await?
        .ok_or_else(|| AppError::not_found("link not found"))?;
    Ok(Json(found.into()))
}
