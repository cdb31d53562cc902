//! # doclink-api: HTTP service for tokenized document collection
//!
//! Recipients submit identity documents against a link token; reviewers
//! manage links and review submissions.
//!
//! ## Route Layout
//!
//! | Group | Auth | Routes |
//! |---|---|---|
//! | Public | none | `POST /v1/submissions`, `GET /v1/verify/:token`, `/openapi.json` |
//! | Admin | bearer | `/v1/links`, `/v1/links/:id`, `PUT /v1/submissions/:id/status`, `POST /v1/uploads/signature` |
//! | Probes | none | `/health/liveness`, `/health/readiness`, `/metrics` |
//!
//! Both `/v1` groups carry the metrics middleware and `TraceLayer`.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    if auth_config.token.is_none() {
        tracing::warn!("AUTH_TOKEN not set, admin routes are unauthenticated");
    }
    let metrics = state.metrics.clone();
    let metrics_on = state.config.metrics_enabled;

    let admin = routes::admin_router().layer(from_fn(auth::auth_middleware));

    let mut api = Router::new()
        .merge(routes::public_router(state.config.submission_body_limit))
        .merge(admin)
        .merge(openapi::router());

    if metrics_on {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(metrics.clone()));
    }

    let api = api
        .layer(TraceLayer::new_for_http())
        .layer(Extension(auth_config))
        .with_state(state.clone());

    let mut probes = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    if metrics_on {
        probes = probes
            .route("/metrics", get(prometheus_metrics))
            .layer(Extension(metrics));
    }

    Router::new().merge(probes.with_state(state)).merge(api)
}

async fn prometheus_metrics(Extension(metrics): Extension<ApiMetrics>) -> impl IntoResponse {
    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

async fn liveness() -> &'static str {
    "ok"
}

/// Ready when the database answers and object storage responds to a ping.
/// Either dependency is skipped when not configured.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = db::ping(pool).await {
            tracing::warn!("Database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    if let Some(storage) = &state.storage {
        if let Err(e) = storage.ping().await {
            tracing::warn!("Storage health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "storage unreachable").into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}
