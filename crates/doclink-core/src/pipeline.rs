//! # Submission Ingestion Pipeline
//!
//! One attempt runs strictly in sequence:
//!
//! ```text
//! token syntax → link lookup → duplicate fast path → classify every slot
//!   → for id, selfie, address: upload → resolve URL
//!   → insert (unique per token)
//! ```
//!
//! The first failure ends the attempt. Objects already uploaded for earlier
//! slots are left in storage; nothing is retried.

use std::sync::Arc;

use chrono::Utc;

use crate::classify::{classify, normalize_mime};
use crate::domain::{AddressProofType, IdType, Link, ResourceCategory, Slot, Submission};
use crate::error::{IngestStep, IngestionError, IngestionErrorKind};
use crate::identity::Token;
use crate::ports::{
    LinkStore, NewSubmission, StorageBackend, StoreError, SubmissionStore, UploadOptions,
};
use crate::resolve::resolve_delivery_url;

/// One file as received from the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotFile {
    /// File contents.
    pub bytes: Vec<u8>,
    /// MIME type declared by the client.
    pub content_type: String,
    /// Original file name, if any.
    pub file_name: Option<String>,
}

impl SlotFile {
    /// Wrap file bytes and their declared MIME type.
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
            file_name: None,
        }
    }

    /// Attach the original file name.
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Size in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// A labelled document: the ID or the proof of address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpload<L> {
    /// Document type chosen by the recipient.
    pub label: Option<L>,
    /// The file.
    pub file: SlotFile,
}

/// Everything a recipient sent in one attempt. Absent slots stay null in the
/// resulting submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotPayloads {
    /// ID document.
    pub id: Option<DocumentUpload<IdType>>,
    /// Selfie.
    pub selfie: Option<SlotFile>,
    /// Proof of address.
    pub address: Option<DocumentUpload<AddressProofType>>,
}

impl SlotPayloads {
    /// Whether no file was supplied at all.
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.selfie.is_none() && self.address.is_none()
    }
}

/// A file that passed classification and waits for upload.
struct ClassifiedFile {
    slot: Slot,
    category: ResourceCategory,
    file: SlotFile,
}

/// Record of one uploaded object, kept only for the duration of an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    /// Slot the object fills.
    pub slot: Slot,
    /// Normalized MIME type.
    pub declared_mime: String,
    /// Size of the uploaded bytes.
    pub size_bytes: u64,
    /// Category it was stored as.
    pub kind: ResourceCategory,
    /// Storage object id.
    pub storage_object_id: String,
    /// Reviewer-facing URL.
    pub delivery_url: String,
}

/// Validates a token, uploads the submitted documents and commits the
/// submission record.
#[derive(Clone)]
pub struct IngestionPipeline {
    links: Arc<dyn LinkStore>,
    submissions: Arc<dyn SubmissionStore>,
    storage: Arc<dyn StorageBackend>,
}

impl std::fmt::Debug for IngestionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionPipeline").finish_non_exhaustive()
    }
}

impl IngestionPipeline {
    /// Build a pipeline over the given stores and storage backend.
    pub fn new(
        links: Arc<dyn LinkStore>,
        submissions: Arc<dyn SubmissionStore>,
        storage: Arc<dyn StorageBackend>,
    ) -> Self {
        Self {
            links,
            submissions,
            storage,
        }
    }

    /// Run one ingestion attempt for `token`.
    pub async fn ingest(
        &self,
        token: &str,
        payloads: SlotPayloads,
    ) -> Result<Submission, IngestionError> {
        let token = Token::parse(token).map_err(|e| IngestionError::validation(e.to_string()))?;
        match self.run(&token, payloads).await {
            Ok(submission) => {
                tracing::info!(
                    link_id = %submission.document_link_id,
                    submission_id = %submission.id,
                    slots = submission.slot_count(),
                    "submission committed"
                );
                Ok(submission)
            }
            Err(err) => {
                match err.kind {
                    IngestionErrorKind::Upload { .. }
                    | IngestionErrorKind::Persistence { .. }
                    | IngestionErrorKind::StoreUnavailable => tracing::error!(
                        token = %token.redacted(),
                        step = %err.step,
                        error = %err,
                        "submission attempt failed"
                    ),
                    _ => tracing::warn!(
                        token = %token.redacted(),
                        step = %err.step,
                        code = err.kind.code(),
                        "submission attempt rejected"
                    ),
                }
                Err(err)
            }
        }
    }

    async fn run(&self, token: &Token, payloads: SlotPayloads) -> Result<Submission, IngestionError> {
        let link = self.validate_token(token).await?;
        self.guard_duplicate(token).await?;

        let SlotPayloads {
            id,
            selfie,
            address,
        } = payloads;
        let id_type = id.as_ref().and_then(|doc| doc.label);
        let address_proof_type = address.as_ref().and_then(|doc| doc.label);

        let classified = classify_all([
            id.map(|doc| (Slot::Id, doc.file)),
            selfie.map(|file| (Slot::Selfie, file)),
            address.map(|doc| (Slot::Address, doc.file)),
        ])?;

        let mut id_picture = None;
        let mut selfie_picture = None;
        let mut address_proof_picture = None;
        for file in classified {
            let asset = self.upload(token, file).await?;
            let resolved = Some((asset.delivery_url, asset.kind));
            match asset.slot {
                Slot::Id => id_picture = resolved,
                Slot::Selfie => selfie_picture = resolved,
                Slot::Address => address_proof_picture = resolved,
            }
        }

        self.commit(NewSubmission {
            document_link_id: link.id,
            token: token.clone(),
            id_type,
            id_picture,
            selfie: selfie_picture,
            address_proof_type,
            address_proof_picture,
            submitted_at: Utc::now(),
        })
        .await
    }

    async fn validate_token(&self, token: &Token) -> Result<Link, IngestionError> {
        self.links
            .get_link_by_token(token)
            .await
            .map_err(|e| IngestionError::store_unavailable(IngestStep::TokenValidation, e))?
            .ok_or_else(IngestionError::not_found)
    }

    async fn guard_duplicate(&self, token: &Token) -> Result<(), IngestionError> {
        let existing = self
            .submissions
            .find_submission_by_token(token)
            .await
            .map_err(|e| IngestionError::store_unavailable(IngestStep::DuplicateCheck, e))?;
        match existing {
            Some(_) => Err(IngestionError::duplicate(IngestStep::DuplicateCheck)),
            None => Ok(()),
        }
    }

    async fn upload(
        &self,
        token: &Token,
        classified: ClassifiedFile,
    ) -> Result<UploadedAsset, IngestionError> {
        let ClassifiedFile {
            slot,
            category,
            file,
        } = classified;
        let declared_mime = normalize_mime(&file.content_type);
        let size_bytes = file.size_bytes();
        let options = UploadOptions {
            folder: format!("{}/{}", token.as_str(), slot),
            resource_category: category,
            public: true,
            file_name: file.file_name,
        };

        let descriptor = self
            .storage
            .upload(file.bytes, &options)
            .await
            .map_err(|e| IngestionError::upload(slot, e))?;
        let delivery_url = resolve_delivery_url(self.storage.as_ref(), &descriptor)
            .map_err(|e| IngestionError::upload(slot, e))?;

        tracing::debug!(
            %slot,
            kind = category.as_str(),
            size_bytes,
            object_id = %descriptor.object_id,
            "uploaded submission asset"
        );

        Ok(UploadedAsset {
            slot,
            declared_mime,
            size_bytes,
            kind: category,
            storage_object_id: descriptor.object_id,
            delivery_url,
        })
    }

    async fn commit(&self, record: NewSubmission) -> Result<Submission, IngestionError> {
        self.submissions
            .insert_submission(record)
            .await
            .map_err(|e| match e {
                StoreError::Duplicate => IngestionError::duplicate(IngestStep::DbInsert),
                StoreError::Field { field, message } => {
                    IngestionError::persistence(Some(field), message)
                }
                StoreError::Backend(detail) => IngestionError::persistence(None, detail),
            })
    }
}

/// Classify every present slot before anything is uploaded.
fn classify_all(
    slots: [Option<(Slot, SlotFile)>; 3],
) -> Result<Vec<ClassifiedFile>, IngestionError> {
    slots
        .into_iter()
        .flatten()
        .map(|(slot, file)| {
            let category = classify(slot, &file.content_type, file.size_bytes())?;
            Ok(ClassifiedFile {
                slot,
                category,
                file,
            })
        })
        .collect()
}
