//! # doclink-storage -- Typed Rust client for document object storage
//!
//! Talks to a Cloudinary-compatible REST API:
//! - **Uploads** of images (`image` resources) and PDFs (`raw` resources),
//!   signed with the API secret.
//! - **Signed delivery URLs** so PDFs open inline for reviewers.
//! - **Direct-upload signatures** for browsers that upload without the service.
//! - **Ping** for readiness checks.
//!
//! [`StorageClient`] implements the `ObjectStorage` and `UrlSigner` ports of
//! `doclink-core`. The client never retries; a failed upload is reported to
//! the caller as-is.

pub mod client;
pub mod config;
pub mod error;
pub mod signing;

pub use client::{StorageClient, UploadResponse};
pub use config::{ConfigError, StorageConfig};
pub use error::StorageApiError;
