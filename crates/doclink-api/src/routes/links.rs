//! # Link Administration API
//!
//! Create, list and delete document links. Every route here sits behind
//! the bearer-token middleware.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use doclink_core::{Link, LinkId, LinkPage, LinkQuery, LinkWithSubmission, NewLink};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::routes::submissions::SubmissionResponse;
use crate::state::AppState;

/// Longest accepted name, surname, email or phone.
const MAX_FIELD_LEN: usize = 255;

/// Request to create a document link.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLinkRequest {
    pub name: String,
    pub surname: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub require_id: bool,
    #[serde(default)]
    pub require_selfie: bool,
    #[serde(default)]
    pub require_address_proof: bool,
}

impl Validate for CreateLinkRequest {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if self.surname.trim().is_empty() {
            return Err("surname must not be empty".to_string());
        }
        let fields = [
            ("name", Some(&self.name)),
            ("surname", Some(&self.surname)),
            ("email", self.email.as_ref()),
            ("phone", self.phone.as_ref()),
        ];
        for (field, value) in fields {
            if value.map_or(false, |v| v.len() > MAX_FIELD_LEN) {
                return Err(format!("{field} must not exceed {MAX_FIELD_LEN} characters"));
            }
        }
        Ok(())
    }
}

impl From<CreateLinkRequest> for NewLink {
    fn from(req: CreateLinkRequest) -> Self {
        Self {
            name: req.name,
            surname: req.surname,
            email: req.email,
            phone: req.phone,
            require_id: req.require_id,
            require_selfie: req.require_selfie,
            require_address_proof: req.require_address_proof,
        }
    }
}

/// A document link, with its submission when one exists.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LinkResponse {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub token: String,
    /// Verification URL to send to the recipient.
    pub link: String,
    pub require_id: bool,
    pub require_selfie: bool,
    pub require_address_proof: bool,
    pub created_at: DateTime<Utc>,
    pub submission: Option<SubmissionResponse>,
}

impl LinkResponse {
    pub fn new(link: Link, submission: Option<SubmissionResponse>) -> Self {
        Self {
            id: *link.id.as_uuid(),
            name: link.name,
            surname: link.surname,
            email: link.email,
            phone: link.phone,
            token: link.token.as_str().to_string(),
            link: link.link,
            require_id: link.require_id,
            require_selfie: link.require_selfie,
            require_address_proof: link.require_address_proof,
            created_at: link.created_at,
            submission,
        }
    }
}

impl From<LinkWithSubmission> for LinkResponse {
    fn from(item: LinkWithSubmission) -> Self {
        Self::new(item.link, item.submission.map(SubmissionResponse::from))
    }
}

/// One page of links.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LinkPageResponse {
    pub items: Vec<LinkResponse>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

impl From<LinkPage> for LinkPageResponse {
    fn from(page: LinkPage) -> Self {
        Self {
            items: page.items.into_iter().map(LinkResponse::from).collect(),
            total: page.total,
            page: page.page,
            per_page: page.per_page,
        }
    }
}

/// Query parameters for listing links.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListLinksParams {
    /// Case-insensitive match on name, surname, email or phone.
    pub search: Option<String>,
    /// One-based page (default 1).
    pub page: Option<u32>,
    /// Page size (default 20, max 100).
    pub per_page: Option<u32>,
}

/// Build the link administration router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/links", get(list_links).post(create_link))
        .route("/v1/links/:id", delete(delete_link))
}

/// POST /v1/links: create a link with a fresh token.
#[utoipa::path(
    post,
    path = "/v1/links",
    request_body = CreateLinkRequest,
    responses(
        (status = 201, description = "Link created", body = LinkResponse),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "links"
)]
async fn create_link(
    State(state): State<AppState>,
    body: Result<Json<CreateLinkRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LinkResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let link = NewLink::from(req).into_link(&state.config.verify_base_url)?;
    let link = state.links.create_link(link).await?;

    tracing::info!(link_id = %link.id, "document link created");
    Ok((StatusCode::CREATED, Json(LinkResponse::new(link, None))))
}

/// GET /v1/links: search and paginate links, newest first.
#[utoipa::path(
    get,
    path = "/v1/links",
    params(ListLinksParams),
    responses(
        (status = 200, description = "Page of links", body = LinkPageResponse),
    ),
    security(("bearer" = [])),
    tag = "links"
)]
async fn list_links(
    State(state): State<AppState>,
    Query(params): Query<ListLinksParams>,
) -> Result<Json<LinkPageResponse>, AppError> {
    let query = LinkQuery::new(params.search, params.page, params.per_page);
    let page = state.links.list_links(&query).await?;
    Ok(Json(page.into()))
}

/// DELETE /v1/links/:id: remove a link and its submission.
#[utoipa::path(
    delete,
    path = "/v1/links/{id}",
    params(("id" = Uuid, Path, description = "Link ID")),
    responses(
        (status = 204, description = "Link deleted"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "links"
)]
async fn delete_link(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.links.delete_link(LinkId::from_uuid(id)).await? {
        tracing::info!(link_id = %id, "document link deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found(format!("link {id} not found")))
    }
}
