//! # Error Hierarchy
//!
//! [`IngestionError`] is the single failure type of the ingestion pipeline.
//! Each error records the [`IngestStep`] it happened in and an
//! [`IngestionErrorKind`] that the HTTP layer maps to a status code.
//! [`ValidationError`] covers newtype and label parsing.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::domain::Slot;

/// Pipeline step in which an ingestion attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IngestStep {
    /// Request shape, token syntax, labels and per-file classification.
    Validation,
    /// Token lookup against the link store.
    TokenValidation,
    /// Fast-path check for an existing submission.
    DuplicateCheck,
    /// Upload of the ID document.
    IdUpload,
    /// Upload of the selfie.
    SelfieUpload,
    /// Upload of the proof of address.
    AddressUpload,
    /// Final insert of the submission record.
    DbInsert,
}

impl IngestStep {
    /// The upload step for a slot.
    pub fn upload(slot: Slot) -> Self {
        match slot {
            Slot::Id => Self::IdUpload,
            Slot::Selfie => Self::SelfieUpload,
            Slot::Address => Self::AddressUpload,
        }
    }

    /// Wire name of the step, e.g. `id-upload`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::TokenValidation => "token-validation",
            Self::DuplicateCheck => "duplicate-check",
            Self::IdUpload => "id-upload",
            Self::SelfieUpload => "selfie-upload",
            Self::AddressUpload => "address-upload",
            Self::DbInsert => "db-insert",
        }
    }
}

impl fmt::Display for IngestStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What went wrong, independent of where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestionErrorKind {
    /// Malformed request: missing token, bad token syntax, unknown labels.
    Validation,
    /// No link exists for the token.
    NotFound,
    /// A submission already exists for the token.
    DuplicateSubmission,
    /// MIME type is neither `image/*` nor `application/pdf`.
    UnsupportedType,
    /// File exceeds [`crate::MAX_FILE_BYTES`].
    PayloadTooLarge,
    /// Accepted MIME type that the slot does not allow (PDF selfie).
    InvalidSlotType,
    /// Object storage rejected or failed the upload of a slot.
    Upload {
        /// Slot whose upload failed.
        slot: Slot,
    },
    /// The submission insert failed for a reason other than uniqueness.
    Persistence {
        /// Offending column, when the store could derive it.
        field: Option<String>,
    },
    /// A store read failed before anything was written.
    StoreUnavailable,
}

impl IngestionErrorKind {
    /// Machine-readable code used in API error bodies and metric labels.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::DuplicateSubmission => "DUPLICATE_SUBMISSION",
            Self::UnsupportedType => "UNSUPPORTED_TYPE",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::InvalidSlotType => "INVALID_SLOT_TYPE",
            Self::Upload { .. } => "UPLOAD_FAILED",
            Self::Persistence { .. } => "PERSISTENCE_ERROR",
            Self::StoreUnavailable => "STORE_UNAVAILABLE",
        }
    }
}

/// Failure of one ingestion attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{step}: {detail}")]
pub struct IngestionError {
    /// Step in which the attempt stopped.
    pub step: IngestStep,
    /// Failure category.
    pub kind: IngestionErrorKind,
    /// Slot the failure concerns, for classifier and upload failures.
    pub slot: Option<Slot>,
    /// Human-readable description. Never contains secrets.
    pub detail: String,
}

impl IngestionError {
    fn new(step: IngestStep, kind: IngestionErrorKind, detail: impl Into<String>) -> Self {
        Self {
            step,
            kind,
            slot: None,
            detail: detail.into(),
        }
    }

    fn for_slot(mut self, slot: Slot) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Malformed request, reported at step `validation`.
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::new(IngestStep::Validation, IngestionErrorKind::Validation, detail)
    }

    /// Unknown token.
    pub fn not_found() -> Self {
        Self::new(
            IngestStep::TokenValidation,
            IngestionErrorKind::NotFound,
            "invalid or expired link",
        )
    }

    /// A submission already exists; `step` tells the fast path from the
    /// constraint-level guard.
    pub fn duplicate(step: IngestStep) -> Self {
        Self::new(
            step,
            IngestionErrorKind::DuplicateSubmission,
            "documents have already been submitted for this link",
        )
    }

    /// MIME type outside `image/*` and `application/pdf`.
    pub fn unsupported_type(slot: Slot, mime: &str) -> Self {
        Self::new(
            IngestStep::Validation,
            IngestionErrorKind::UnsupportedType,
            format!("{slot} file has unsupported type '{mime}'; only images and PDF files are allowed"),
        )
        .for_slot(slot)
    }

    /// File larger than the per-file cap.
    pub fn payload_too_large(slot: Slot, size_bytes: u64, max_bytes: u64) -> Self {
        Self::new(
            IngestStep::Validation,
            IngestionErrorKind::PayloadTooLarge,
            format!("{slot} file is {size_bytes} bytes; the maximum is {max_bytes} bytes"),
        )
        .for_slot(slot)
    }

    /// Request body exceeded the transport limit before any slot was read
    /// in full.
    pub fn request_too_large(detail: impl Into<String>) -> Self {
        Self::new(
            IngestStep::Validation,
            IngestionErrorKind::PayloadTooLarge,
            detail,
        )
    }

    /// Accepted media kind that the slot forbids.
    pub fn invalid_slot_type(slot: Slot, mime: &str) -> Self {
        Self::new(
            IngestStep::Validation,
            IngestionErrorKind::InvalidSlotType,
            format!("{slot} must be an image, got '{mime}'"),
        )
        .for_slot(slot)
    }

    /// Upload of `slot` failed.
    pub fn upload(slot: Slot, reason: impl fmt::Display) -> Self {
        Self::new(
            IngestStep::upload(slot),
            IngestionErrorKind::Upload { slot },
            format!("failed to upload {slot} document: {reason}"),
        )
        .for_slot(slot)
    }

    /// Insert failed for a reason other than uniqueness.
    pub fn persistence(field: Option<String>, detail: impl fmt::Display) -> Self {
        Self::new(
            IngestStep::DbInsert,
            IngestionErrorKind::Persistence { field },
            format!("failed to save submission: {detail}"),
        )
    }

    /// A store read failed at `step`.
    pub fn store_unavailable(step: IngestStep, detail: impl fmt::Display) -> Self {
        Self::new(
            step,
            IngestionErrorKind::StoreUnavailable,
            format!("store lookup failed: {detail}"),
        )
    }

    /// Offending column of a persistence failure.
    pub fn field(&self) -> Option<&str> {
        match &self.kind {
            IngestionErrorKind::Persistence { field } => field.as_deref(),
            _ => None,
        }
    }
}

/// Validation errors for newtypes, labels and admin inputs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No token supplied.
    #[error("token is required")]
    MissingToken,

    /// Token fails syntax rules.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// ID type label is not one of the known document types.
    #[error("unknown id type \"{0}\" (expected passport, driving_license, national_id or residence_permit)")]
    UnknownIdType(String),

    /// Address proof label is not one of the known document types.
    #[error("unknown address proof type \"{0}\" (expected utility_bill, bank_statement, rental_agreement or government_letter)")]
    UnknownAddressProofType(String),

    /// Status label is not one of the review states.
    #[error("unknown submission status \"{0}\" (expected submitted, approved or rejected)")]
    UnknownStatus(String),

    /// A required text field was missing or blank.
    #[error("{0} is required")]
    MissingField(&'static str),
}
