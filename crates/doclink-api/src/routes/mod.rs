//! # API Route Modules
//!
//! - `submissions`: public multipart ingestion; reviewer status updates.
//! - `verify`: public link lookup for the recipient page.
//! - `links`: link creation, search and deletion (admin).
//! - `uploads`: direct-upload signatures (admin).

pub mod links;
pub mod submissions;
pub mod uploads;
pub mod verify;

use axum::Router;

use crate::state::AppState;

/// Routes reachable without credentials.
pub fn public_router(submission_body_limit: usize) -> Router<AppState> {
    Router::new()
        .merge(submissions::public_router(submission_body_limit))
        .merge(verify::router())
}

/// Routes that require the admin bearer token.
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .merge(links::router())
        .merge(submissions::admin_router())
        .merge(uploads::router())
}
