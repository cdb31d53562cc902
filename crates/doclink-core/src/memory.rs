//! # In-Memory Stores
//!
//! [`MemoryStore`] implements both store ports over one `parking_lot`
//! lock. It backs the service when no database is configured and is the
//! store used by tests.
//!
//! The lock is never held across an `.await`. Submission inserts check the
//! token and write the row under a single write guard, which gives the same
//! guarantee as a unique index.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::{Link, LinkPage, LinkQuery, LinkWithSubmission, Submission, SubmissionStatus};
use crate::identity::{LinkId, SubmissionId, Token};
use crate::ports::{LinkStore, NewSubmission, StoreError, SubmissionStore};

#[derive(Debug, Default)]
struct Tables {
    links: HashMap<LinkId, Link>,
    submissions: HashMap<SubmissionId, Submission>,
}

impl Tables {
    fn submission_for_token(&self, token: &Token) -> Option<&Submission> {
        self.submissions.values().find(|s| &s.token == token)
    }

    fn with_submission(&self, link: &Link) -> LinkWithSubmission {
        LinkWithSubmission {
            link: link.clone(),
            submission: self
                .submissions
                .values()
                .find(|s| s.document_link_id == link.id)
                .cloned(),
        }
    }
}

/// Thread-safe, cloneable store for links and submissions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored submissions.
    pub fn submission_count(&self) -> usize {
        self.tables.read().submissions.len()
    }
}

#[async_trait]
impl LinkStore for MemoryStore {
    async fn get_link_by_token(&self, token: &Token) -> Result<Option<Link>, StoreError> {
        Ok(self
            .tables
            .read()
            .links
            .values()
            .find(|l| &l.token == token)
            .cloned())
    }

    async fn create_link(&self, link: Link) -> Result<Link, StoreError> {
        let mut tables = self.tables.write();
        if tables
            .links
            .values()
            .any(|l| l.id == link.id || l.token == link.token)
        {
            return Err(StoreError::Duplicate);
        }
        tables.links.insert(link.id, link.clone());
        Ok(link)
    }

    async fn list_links(&self, query: &LinkQuery) -> Result<LinkPage, StoreError> {
        let tables = self.tables.read();
        let mut matching: Vec<&Link> = tables
            .links
            .values()
            .filter(|l| query.matches(l))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(query.per_page as usize)
            .map(|l| tables.with_submission(l))
            .collect();

        Ok(LinkPage {
            items,
            total,
            page: query.page,
            per_page: query.per_page,
        })
    }

    async fn delete_link(&self, id: LinkId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write();
        if tables.links.remove(&id).is_none() {
            return Ok(false);
        }
        tables.submissions.retain(|_, s| s.document_link_id != id);
        Ok(true)
    }

    async fn get_link_with_submission(
        &self,
        token: &Token,
    ) -> Result<Option<LinkWithSubmission>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .links
            .values()
            .find(|l| &l.token == token)
            .map(|l| tables.with_submission(l)))
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn find_submission_by_token(
        &self,
        token: &Token,
    ) -> Result<Option<Submission>, StoreError> {
        Ok(self.tables.read().submission_for_token(token).cloned())
    }

    async fn insert_submission(&self, record: NewSubmission) -> Result<Submission, StoreError> {
        let mut tables = self.tables.write();
        if tables.submission_for_token(&record.token).is_some() {
            return Err(StoreError::Duplicate);
        }
        if !tables.links.contains_key(&record.document_link_id) {
            return Err(StoreError::Field {
                field: "document_link_id".into(),
                message: "referenced link does not exist".into(),
            });
        }
        let submission = record.into_submission();
        tables.submissions.insert(submission.id, submission.clone());
        Ok(submission)
    }

    async fn update_status(
        &self,
        id: SubmissionId,
        status: SubmissionStatus,
    ) -> Result<Option<Submission>, StoreError> {
        let mut tables = self.tables.write();
        Ok(tables.submissions.get_mut(&id).map(|s| {
            s.status = status;
            s.clone()
        }))
    }
}
