//! Link persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `links` table.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use doclink_core::{Link, LinkId, LinkPage, LinkQuery, LinkWithSubmission, Submission, Token};
use sqlx::PgPool;
use uuid::Uuid;

use super::{like_pattern, submissions};

const LINK_COLUMNS: &str = "id, name, surname, email, phone, token, link, \
     require_id, require_selfie, require_address_proof, created_at";

const SEARCH_CLAUSE: &str = "($1::text IS NULL
     OR name ILIKE $1 OR surname ILIKE $1 OR email ILIKE $1 OR phone ILIKE $1)";

/// Insert a new link.
pub async fn insert(pool: &PgPool, link: &Link) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO links (id, name, surname, email, phone, token, link,
         require_id, require_selfie, require_address_proof, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(link.id.as_uuid())
    .bind(&link.name)
    .bind(&link.surname)
    .bind(&link.email)
    .bind(&link.phone)
    .bind(link.token.as_str())
    .bind(&link.link)
    .bind(link.require_id)
    .bind(link.require_selfie)
    .bind(link.require_address_proof)
    .bind(link.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetch a link by token.
pub async fn get_by_token(pool: &PgPool, token: &Token) -> Result<Option<Link>, sqlx::Error> {
    let row = sqlx::query_as::<_, LinkRow>(&format!(
        "SELECT {LINK_COLUMNS} FROM links WHERE token = $1"
    ))
    .bind(token.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(row.and_then(LinkRow::into_record))
}

/// Delete a link. Its submission goes with it (`ON DELETE CASCADE`).
pub async fn delete(pool: &PgPool, id: LinkId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM links WHERE id = $1")
        .bind(id.as_uuid())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// One page of links, newest first, each with its submission.
pub async fn list(pool: &PgPool, query: &LinkQuery) -> Result<LinkPage, sqlx::Error> {
    let pattern = query.search.as_deref().map(like_pattern);

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM links WHERE {SEARCH_CLAUSE}"
    ))
    .bind(&pattern)
    .fetch_one(pool)
    .await?;

    let rows = sqlx::query_as::<_, LinkRow>(&format!(
        "SELECT {LINK_COLUMNS} FROM links WHERE {SEARCH_CLAUSE}
         ORDER BY created_at DESC, id LIMIT $2 OFFSET $3"
    ))
    .bind(&pattern)
    .bind(i64::from(query.per_page))
    .bind(i64::try_from(query.offset()).unwrap_or(i64::MAX))
    .fetch_all(pool)
    .await?;

    let links: Vec<Link> = rows.into_iter().filter_map(LinkRow::into_record).collect();
    let ids: Vec<Uuid> = links.iter().map(|l| *l.id.as_uuid()).collect();
    let mut by_link: HashMap<LinkId, Submission> = submissions::for_links(pool, &ids)
        .await?
        .into_iter()
        .map(|s| (s.document_link_id, s))
        .collect();

    let items = links
        .into_iter()
        .map(|link| {
            let submission = by_link.remove(&link.id);
            LinkWithSubmission { link, submission }
        })
        .collect();

    Ok(LinkPage {
        items,
        total: u64::try_from(total).unwrap_or(0),
        page: query.page,
        per_page: query.per_page,
    })
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct LinkRow {
    id: Uuid,
    name: String,
    surname: String,
    email: Option<String>,
    phone: Option<String>,
    token: String,
    link: String,
    require_id: bool,
    require_selfie: bool,
    require_address_proof: bool,
    created_at: DateTime<Utc>,
}

impl LinkRow {
    fn into_record(self) -> Option<Link> {
        let token = match Token::parse(&self.token) {
            Ok(t) => t,
            Err(_) => {
                tracing::warn!(id = %self.id, "skipping link row with malformed token");
                return None;
            }
        };
        Some(Link {
            id: LinkId::from_uuid(self.id),
            name: self.name,
            surname: self.surname,
            email: self.email,
            phone: self.phone,
            token,
            link: self.link,
            require_id: self.require_id,
            require_selfie: self.require_selfie,
            require_address_proof: self.require_address_proof,
            created_at: self.created_at,
        })
    }
}
