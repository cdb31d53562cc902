//! # Database Persistence Layer
//!
//! Postgres persistence for links and submissions via SQLx.
//!
//! ## Architecture
//!
//! The database layer is **optional**. When `DATABASE_URL` is set, links
//! and submissions live in PostgreSQL and the one-submission-per-token rule
//! is enforced by the `submissions_token_key` unique constraint. When
//! absent, the API falls back to the in-memory store from `doclink-core`
//! (suitable for development and testing).
//!
//! The free functions in [`links`] and [`submissions`] take a `&PgPool`
//! and return `sqlx::Error`; [`PgStore`] adapts them to the store ports and
//! translates constraint violations into [`StoreError`].

pub mod links;
pub mod submissions;

use async_trait::async_trait;
use doclink_core::{
    Link, LinkId, LinkPage, LinkQuery, LinkStore, LinkWithSubmission, NewSubmission, StoreError,
    Submission, SubmissionId, SubmissionStatus, SubmissionStore, Token,
};
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => {
            tracing::warn!(
                "DATABASE_URL not set, running in-memory only mode. \
                 Links and submissions will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

/// Run a trivial query; used by the readiness probe.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Postgres-backed implementation of both store ports.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkStore for PgStore {
    async fn get_link_by_token(&self, token: &Token) -> Result<Option<Link>, StoreError> {
        links::get_by_token(&self.pool, token)
            .await
            .map_err(store_error)
    }

    async fn create_link(&self, link: Link) -> Result<Link, StoreError> {
        links::insert(&self.pool, &link).await.map_err(store_error)?;
        Ok(link)
    }

    async fn list_links(&self, query: &LinkQuery) -> Result<LinkPage, StoreError> {
        links::list(&self.pool, query).await.map_err(store_error)
    }

    async fn delete_link(&self, id: LinkId) -> Result<bool, StoreError> {
        links::delete(&self.pool, id).await.map_err(store_error)
    }

    async fn get_link_with_submission(
        &self,
        token: &Token,
    ) -> Result<Option<LinkWithSubmission>, StoreError> {
        let Some(link) = self.get_link_by_token(token).await? else {
            return Ok(None);
        };
        let submission = self.find_submission_by_token(token).await?;
        Ok(Some(LinkWithSubmission { link, submission }))
    }
}

#[async_trait]
impl SubmissionStore for PgStore {
    async fn find_submission_by_token(
        &self,
        token: &Token,
    ) -> Result<Option<Submission>, StoreError> {
        submissions::get_by_token(&self.pool, token)
            .await
            .map_err(store_error)
    }

    async fn insert_submission(&self, record: NewSubmission) -> Result<Submission, StoreError> {
        let submission = record.into_submission();
        submissions::insert(&self.pool, &submission)
            .await
            .map_err(store_error)?;
        Ok(submission)
    }

    async fn update_status(
        &self,
        id: SubmissionId,
        status: SubmissionStatus,
    ) -> Result<Option<Submission>, StoreError> {
        submissions::update_status(&self.pool, id, status)
            .await
            .map_err(store_error)
    }
}

/// Translate a SQLx error into the store port's error.
///
/// Unique violations are duplicates. Foreign-key and check violations are
/// attributed to the column their constraint guards. Everything else is a
/// backend failure.
fn store_error(err: sqlx::Error) -> StoreError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            return StoreError::Duplicate;
        }
        if db_err.is_foreign_key_violation() || db_err.is_check_violation() {
            let field = db_err
                .constraint()
                .map(constraint_field)
                .unwrap_or_else(|| "unknown".to_string());
            return StoreError::Field {
                field,
                message: db_err.message().to_string(),
            };
        }
    }
    StoreError::Backend(err.to_string())
}

/// `submissions_id_type_check` -> `id_type`.
fn constraint_field(constraint: &str) -> String {
    let name = ["submissions_", "links_"]
        .iter()
        .find_map(|prefix| constraint.strip_prefix(prefix))
        .unwrap_or(constraint);
    let name = ["_check", "_fkey", "_key"]
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
        .unwrap_or(name);
    name.to_string()
}

/// Escape `%`, `_` and `\` so a search term matches literally under ILIKE.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
