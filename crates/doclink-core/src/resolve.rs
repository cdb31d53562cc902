//! # URL Resolver
//!
//! Images are delivered by their plain secure URL. Documents (PDFs) are
//! delivered by a signed URL that asks the browser to render inline, so a
//! reviewer can open them without an authentication error and without a
//! forced download.

use crate::domain::ResourceCategory;
use crate::ports::{DeliveryDescriptor, SignOptions, StorageError, UrlSigner};

/// Derive the reviewer-facing URL for an uploaded object.
pub fn resolve_delivery_url<S: UrlSigner + ?Sized>(
    signer: &S,
    descriptor: &DeliveryDescriptor,
) -> Result<String, StorageError> {
    match descriptor.resource_category {
        ResourceCategory::Image => Ok(descriptor.secure_url.clone()),
        ResourceCategory::Document => signer.sign_url(descriptor, SignOptions { inline: true }),
    }
}
