//! Submission persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `submissions` table.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use doclink_core::{
    LinkId, ResourceCategory, Submission, SubmissionId, SubmissionStatus, Token,
};
use sqlx::PgPool;
use uuid::Uuid;

const SUBMISSION_COLUMNS: &str = "id, document_link_id, token, id_type, id_picture_url, \
     id_picture_category, selfie_url, selfie_category, address_proof_type, \
     address_proof_picture_url, address_proof_picture_category, submitted_at, status";

/// Insert a submission. A second row for the same token violates
/// `submissions_token_key`.
pub async fn insert(pool: &PgPool, submission: &Submission) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO submissions (id, document_link_id, token, id_type, id_picture_url,
         id_picture_category, selfie_url, selfie_category, address_proof_type,
         address_proof_picture_url, address_proof_picture_category, submitted_at, status)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
    )
    .bind(submission.id.as_uuid())
    .bind(submission.document_link_id.as_uuid())
    .bind(submission.token.as_str())
    .bind(submission.id_type.map(|t| t.as_str()))
    .bind(&submission.id_picture_url)
    .bind(submission.id_picture_category.map(|c| c.as_str()))
    .bind(&submission.selfie_url)
    .bind(submission.selfie_category.map(|c| c.as_str()))
    .bind(submission.address_proof_type.map(|t| t.as_str()))
    .bind(&submission.address_proof_picture_url)
    .bind(submission.address_proof_picture_category.map(|c| c.as_str()))
    .bind(submission.submitted_at)
    .bind(submission.status.as_str())
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetch the submission for a token.
pub async fn get_by_token(
    pool: &PgPool,
    token: &Token,
) -> Result<Option<Submission>, sqlx::Error> {
    let row = sqlx::query_as::<_, SubmissionRow>(&format!(
        "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE token = $1"
    ))
    .bind(token.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(row.and_then(SubmissionRow::into_record))
}

/// Submissions belonging to any of `link_ids`.
pub async fn for_links(pool: &PgPool, link_ids: &[Uuid]) -> Result<Vec<Submission>, sqlx::Error> {
    if link_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_as::<_, SubmissionRow>(&format!(
        "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE document_link_id = ANY($1)"
    ))
    .bind(link_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .filter_map(SubmissionRow::into_record)
        .collect())
}

/// Set the review status, returning the updated row.
pub async fn update_status(
    pool: &PgPool,
    id: SubmissionId,
    status: SubmissionStatus,
) -> Result<Option<Submission>, sqlx::Error> {
    let row = sqlx::query_as::<_, SubmissionRow>(&format!(
        "UPDATE submissions SET status = $1 WHERE id = $2 RETURNING {SUBMISSION_COLUMNS}"
    ))
    .bind(status.as_str())
    .bind(id.as_uuid())
    .fetch_optional(pool)
    .await?;

    Ok(row.and_then(SubmissionRow::into_record))
}

/// Parse an optional label column, logging and dropping unknown values.
fn parse_column<T: FromStr>(id: Uuid, column: &'static str, value: Option<String>) -> Option<T> {
    let value = value?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(%id, column, value = %value, "unknown value in submissions row");
            None
        }
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct SubmissionRow {
    id: Uuid,
    document_link_id: Uuid,
    token: String,
    id_type: Option<String>,
    id_picture_url: Option<String>,
    id_picture_category: Option<String>,
    selfie_url: Option<String>,
    selfie_category: Option<String>,
    address_proof_type: Option<String>,
    address_proof_picture_url: Option<String>,
    address_proof_picture_category: Option<String>,
    submitted_at: DateTime<Utc>,
    status: String,
}

impl SubmissionRow {
    fn into_record(self) -> Option<Submission> {
        let id = self.id;
        let Ok(token) = Token::parse(&self.token) else {
            tracing::warn!(%id, "skipping submission row with malformed token");
            return None;
        };
        let status = match SubmissionStatus::from_str(&self.status) {
            Ok(s) => s,
            Err(_) => {
                tracing::warn!(
                    %id,
                    status = %self.status,
                    "unknown submission status in database, defaulting to submitted"
                );
                SubmissionStatus::Submitted
            }
        };
        Some(Submission {
            id: SubmissionId::from_uuid(id),
            document_link_id: LinkId::from_uuid(self.document_link_id),
            token,
            id_type: parse_column(id, "id_type", self.id_type),
            id_picture_url: self.id_picture_url,
            id_picture_category: parse_column::<ResourceCategory>(
                id,
                "id_picture_category",
                self.id_picture_category,
            ),
            selfie_url: self.selfie_url,
            selfie_category: parse_column(id, "selfie_category", self.selfie_category),
            address_proof_type: parse_column(id, "address_proof_type", self.address_proof_type),
            address_proof_picture_url: self.address_proof_picture_url,
            address_proof_picture_category: parse_column(
                id,
                "address_proof_picture_category",
                self.address_proof_picture_category,
            ),
            submitted_at: self.submitted_at,
            status,
        })
    }
}
