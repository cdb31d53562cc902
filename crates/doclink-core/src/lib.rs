#![deny(missing_docs)]

//! # doclink-core: Submission Ingestion for Tokenized Document Links
//!
//! This crate holds everything the ingestion pipeline needs that is not a
//! transport concern: domain records, the token newtype, the asset
//! classifier, the URL resolver, the store and storage ports, and the
//! pipeline that ties them together.
//!
//! ## Design Principles
//!
//! 1. **Ports, not drivers.** Persistence and object storage are reached
//!    through the traits in [`ports`]. The HTTP service supplies Postgres and
//!    the storage client; tests supply [`memory::MemoryStore`] and fakes.
//!
//! 2. **Classify everything, then upload.** Every present slot passes the
//!    [`classify`] rules before the first byte leaves the process.
//!
//! 3. **The store owns uniqueness.** The pre-check in the pipeline is a fast
//!    path. A unique constraint (or a single write lock in memory) decides
//!    which of two concurrent attempts wins.
//!
//! 4. **Structured errors.** Every failure is an [`IngestionError`] carrying
//!    the step it happened in. No `.unwrap()` outside tests.

pub mod classify;
pub mod domain;
pub mod error;
pub mod identity;
pub mod memory;
pub mod pipeline;
pub mod ports;
pub mod resolve;

pub use classify::{classify, normalize_mime, MAX_FILE_BYTES};
pub use domain::{
    AddressProofType, IdType, Link, LinkPage, LinkQuery, LinkWithSubmission, NewLink,
    ResourceCategory, Slot, Submission, SubmissionStatus,
};
pub use error::{IngestStep, IngestionError, IngestionErrorKind, ValidationError};
pub use identity::{LinkId, SubmissionId, Token};
pub use memory::MemoryStore;
pub use pipeline::{DocumentUpload, IngestionPipeline, SlotFile, SlotPayloads, UploadedAsset};
pub use ports::{
    AccessType, DeliveryDescriptor, DirectUploadSignature, LinkStore, NewSubmission,
    ObjectStorage, SignOptions, StorageBackend, StorageError, StoreError, SubmissionStore,
    UploadOptions, UrlSigner,
};
pub use resolve::resolve_delivery_url;
