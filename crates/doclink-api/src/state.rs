//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Architecture
//!
//! - **Stores**: Postgres when a pool is supplied, otherwise one shared
//!   [`MemoryStore`] serving both the link and submission ports.
//! - **Storage**: optional. Without credentials the submission and upload
//!   signature routes answer 503.
//! - **Pipeline**: built once from the stores and storage; handlers never
//!   assemble it per request.

use std::sync::Arc;

use doclink_core::{IngestionPipeline, LinkStore, MemoryStore, StorageBackend, SubmissionStore};
use sqlx::PgPool;

use crate::auth::SecretToken;
use crate::db::PgStore;
use crate::middleware::metrics::ApiMetrics;
use crate::routes::submissions::SUBMISSION_BODY_LIMIT;

/// Default public base URL for verification links.
pub const DEFAULT_VERIFY_BASE_URL: &str = "https://verify.example.com";

/// Application configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Static bearer token for the admin routes. `None` disables auth.
    pub auth_token: Option<SecretToken>,
    /// Base URL recipients open; links are `{base}/verify/{token}`.
    pub verify_base_url: String,
    /// Whether `/metrics` is served.
    pub metrics_enabled: bool,
    /// Maximum size in bytes of a whole submission request body.
    pub submission_body_limit: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("verify_base_url", &self.verify_base_url)
            .field("metrics_enabled", &self.metrics_enabled)
            .field("submission_body_limit", &self.submission_body_limit)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            verify_base_url: DEFAULT_VERIFY_BASE_URL.to_string(),
            metrics_enabled: true,
            submission_body_limit: SUBMISSION_BODY_LIMIT,
        }
    }
}

impl AppConfig {
    /// Build configuration from `PORT`, `AUTH_TOKEN`, `VERIFY_BASE_URL`,
    /// `DOCLINK_METRICS_ENABLED` and `DOCLINK_SUBMISSION_BODY_LIMIT`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            auth_token: std::env::var("AUTH_TOKEN")
                .ok()
                .filter(|t| !t.is_empty())
                .map(SecretToken::new),
            verify_base_url: std::env::var("VERIFY_BASE_URL")
                .ok()
                .filter(|u| !u.trim().is_empty())
                .unwrap_or(defaults.verify_base_url),
            metrics_enabled: std::env::var("DOCLINK_METRICS_ENABLED")
                .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"))
                .unwrap_or(defaults.metrics_enabled),
            submission_body_limit: std::env::var("DOCLINK_SUBMISSION_BODY_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|limit: &usize| *limit > 0)
                .unwrap_or(defaults.submission_body_limit),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub links: Arc<dyn LinkStore>,
    pub submissions: Arc<dyn SubmissionStore>,
    pub storage: Option<Arc<dyn StorageBackend>>,
    pub pipeline: Option<IngestionPipeline>,
    /// Present when running against Postgres; used by the readiness probe.
    pub db_pool: Option<PgPool>,
    pub metrics: ApiMetrics,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("storage_configured", &self.storage.is_some())
            .field("database", &self.db_pool.is_some())
            .finish()
    }
}

impl AppState {
    /// In-memory state with default configuration and no storage.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None, None)
    }

    /// Build state, choosing Postgres stores when `db_pool` is present.
    pub fn with_config(
        config: AppConfig,
        storage: Option<Arc<dyn StorageBackend>>,
        db_pool: Option<PgPool>,
    ) -> Self {
        let (links, submissions): (Arc<dyn LinkStore>, Arc<dyn SubmissionStore>) = match &db_pool
        {
            Some(pool) => {
                let store = PgStore::new(pool.clone());
                (Arc::new(store.clone()), Arc::new(store))
            }
            None => {
                let store = MemoryStore::new();
                (Arc::new(store.clone()), Arc::new(store))
            }
        };
        let mut state = Self::with_stores(config, links, submissions, storage);
        state.db_pool = db_pool;
        state
    }

    /// Build state over explicit stores.
    pub fn with_stores(
        config: AppConfig,
        links: Arc<dyn LinkStore>,
        submissions: Arc<dyn SubmissionStore>,
        storage: Option<Arc<dyn StorageBackend>>,
    ) -> Self {
        let pipeline = storage.as_ref().map(|storage| {
            IngestionPipeline::new(links.clone(), submissions.clone(), storage.clone())
        });
        Self {
            config,
            links,
            submissions,
            storage,
            pipeline,
            db_pool: None,
            metrics: ApiMetrics::new(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
