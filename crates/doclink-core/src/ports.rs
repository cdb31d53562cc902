//! # Ports
//!
//! Traits through which the pipeline and the HTTP routes reach persistence
//! and object storage. Implementations live elsewhere: Postgres in
//! `doclink-api`, the storage REST client in `doclink-storage`, and
//! [`crate::memory::MemoryStore`] for tests and database-less runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{
    AddressProofType, IdType, Link, LinkPage, LinkQuery, LinkWithSubmission, ResourceCategory,
    Submission, SubmissionStatus,
};
use crate::identity::{LinkId, SubmissionId, Token};

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Errors from link and submission stores.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("duplicate record")]
    Duplicate,

    /// A constraint tied to a specific column rejected the write.
    #[error("constraint violated on {field}: {message}")]
    Field {
        /// Offending column.
        field: String,
        /// Constraint description.
        message: String,
    },

    /// Connectivity, pool or other backend failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Fully resolved submission ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubmission {
    /// Link being answered.
    pub document_link_id: LinkId,
    /// Token of that link.
    pub token: Token,
    /// ID document type.
    pub id_type: Option<IdType>,
    /// Reviewer URL and category of the ID document.
    pub id_picture: Option<(String, ResourceCategory)>,
    /// Reviewer URL and category of the selfie.
    pub selfie: Option<(String, ResourceCategory)>,
    /// Address proof type.
    pub address_proof_type: Option<AddressProofType>,
    /// Reviewer URL and category of the address proof.
    pub address_proof_picture: Option<(String, ResourceCategory)>,
    /// Commit time.
    pub submitted_at: DateTime<Utc>,
}

impl NewSubmission {
    /// Materialize the record with a fresh id and status `submitted`.
    pub fn into_submission(self) -> Submission {
        let (id_picture_url, id_picture_category) = unzip(self.id_picture);
        let (selfie_url, selfie_category) = unzip(self.selfie);
        let (address_proof_picture_url, address_proof_picture_category) =
            unzip(self.address_proof_picture);
        Submission {
            id: SubmissionId::new(),
            document_link_id: self.document_link_id,
            token: self.token,
            id_type: self.id_type,
            id_picture_url,
            id_picture_category,
            selfie_url,
            selfie_category,
            address_proof_type: self.address_proof_type,
            address_proof_picture_url,
            address_proof_picture_category,
            submitted_at: self.submitted_at,
            status: SubmissionStatus::Submitted,
        }
    }
}

fn unzip(pair: Option<(String, ResourceCategory)>) -> (Option<String>, Option<ResourceCategory>) {
    match pair {
        Some((url, category)) => (Some(url), Some(category)),
        None => (None, None),
    }
}

/// Link persistence.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Look up the link bound to `token`.
    async fn get_link_by_token(&self, token: &Token) -> Result<Option<Link>, StoreError>;

    /// Persist a new link. Token collisions surface as [`StoreError::Duplicate`].
    async fn create_link(&self, link: Link) -> Result<Link, StoreError>;

    /// Page through links, newest first, each with its submission.
    async fn list_links(&self, query: &LinkQuery) -> Result<LinkPage, StoreError>;

    /// Delete a link and its submission. Returns `false` if it did not exist.
    async fn delete_link(&self, id: LinkId) -> Result<bool, StoreError>;

    /// Look up the link bound to `token` together with its submission.
    async fn get_link_with_submission(
        &self,
        token: &Token,
    ) -> Result<Option<LinkWithSubmission>, StoreError>;
}

/// Submission persistence.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Look up the submission for `token`.
    async fn find_submission_by_token(
        &self,
        token: &Token,
    ) -> Result<Option<Submission>, StoreError>;

    /// Insert a submission. A second insert for the same token must fail
    /// with [`StoreError::Duplicate`], including under concurrency.
    async fn insert_submission(&self, record: NewSubmission) -> Result<Submission, StoreError>;

    /// Set the review status. Returns `None` if the submission does not exist.
    async fn update_status(
        &self,
        id: SubmissionId,
        status: SubmissionStatus,
    ) -> Result<Option<Submission>, StoreError>;
}

// ---------------------------------------------------------------------------
// Object storage
// ---------------------------------------------------------------------------

/// Errors from object storage and URL signing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Storage could not be reached or the request timed out.
    #[error("storage unreachable: {0}")]
    Transport(String),

    /// Storage answered with a non-success status.
    #[error("storage rejected the request with status {status}: {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Error message reported by storage.
        message: String,
    },

    /// Storage answered with a body that could not be interpreted.
    #[error("unexpected storage response: {0}")]
    InvalidResponse(String),

    /// A delivery URL could not be signed.
    #[error("url signing failed: {0}")]
    Signing(String),
}

/// Options for one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    /// Destination folder, `{token}/{slot}`.
    pub folder: String,
    /// Category the object is stored as.
    pub resource_category: ResourceCategory,
    /// Whether the object is publicly retrievable.
    pub public: bool,
    /// Original file name, when the caller supplied one.
    pub file_name: Option<String>,
}

/// Delivery type of a stored object, as reported by storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    /// Publicly delivered object.
    Upload,
    /// Object delivered only through signed URLs.
    Private,
    /// Object delivered only through signed or token-authenticated URLs.
    Authenticated,
}

impl AccessType {
    /// Path segment used in delivery URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Private => "private",
            Self::Authenticated => "authenticated",
        }
    }
}

/// Where and how an uploaded object can be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDescriptor {
    /// Storage object id (public id), including the folder.
    pub object_id: String,
    /// Category the object was stored as.
    pub resource_category: ResourceCategory,
    /// Delivery type.
    pub access_type: AccessType,
    /// Unsigned HTTPS delivery URL.
    pub secure_url: String,
    /// Object version, when storage reports one.
    pub version: Option<u64>,
}

/// Options for signing a delivery URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignOptions {
    /// Ask browsers to render the object rather than download it.
    pub inline: bool,
}

/// Parameters a browser needs to upload directly into storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectUploadSignature {
    /// Hex signature over the signed parameters.
    pub signature: String,
    /// Unix timestamp included in the signature.
    pub timestamp: i64,
    /// Folder the upload is restricted to.
    pub folder: String,
    /// Storage account name.
    pub cloud_name: String,
    /// Public API key.
    pub api_key: String,
}

/// Uploads bytes into object storage.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload `bytes` and describe where the object can be delivered from.
    async fn upload(
        &self,
        bytes: Vec<u8>,
        options: &UploadOptions,
    ) -> Result<DeliveryDescriptor, StorageError>;

    /// Check that storage is reachable with the configured credentials.
    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Produces signed delivery URLs and direct-upload signatures.
pub trait UrlSigner: Send + Sync {
    /// Sign a delivery URL for `descriptor`. Must be deterministic for a
    /// fixed descriptor, options and secret.
    fn sign_url(
        &self,
        descriptor: &DeliveryDescriptor,
        options: SignOptions,
    ) -> Result<String, StorageError>;

    /// Sign a browser upload restricted to `folder`.
    fn sign_direct_upload(&self, folder: &str) -> Result<DirectUploadSignature, StorageError>;
}

/// Object storage that can also sign URLs.
pub trait StorageBackend: ObjectStorage + UrlSigner {}

impl<T: ObjectStorage + UrlSigner> StorageBackend for T {}
