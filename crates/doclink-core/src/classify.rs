//! # Asset Classifier
//!
//! Decides, before anything is uploaded, whether a file may occupy a slot and
//! which [`ResourceCategory`] it is stored as.
//!
//! Rules, checked in this order:
//!
//! 1. The MIME type must be `image/*` or exactly `application/pdf`.
//! 2. The file must not exceed [`MAX_FILE_BYTES`] (25 MiB).
//! 3. The selfie slot accepts images only.
//!
//! MIME comparison ignores case and parameters.

use crate::domain::{ResourceCategory, Slot};
use crate::error::IngestionError;

/// Per-file size cap in bytes (25 MiB).
pub const MAX_FILE_BYTES: u64 = 26_214_400;

const PDF_MIME: &str = "application/pdf";

/// Lowercase a declared MIME type and drop any `;` parameters.
pub fn normalize_mime(declared: &str) -> String {
    declared
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn is_image(mime: &str) -> bool {
    mime.strip_prefix("image/")
        .is_some_and(|subtype| !subtype.is_empty())
}

/// Classify one file for `slot`.
pub fn classify(
    slot: Slot,
    declared_mime: &str,
    size_bytes: u64,
) -> Result<ResourceCategory, IngestionError> {
    let mime = normalize_mime(declared_mime);
    let image = is_image(&mime);

    if !image && mime != PDF_MIME {
        return Err(IngestionError::unsupported_type(slot, declared_mime));
    }
    if size_bytes > MAX_FILE_BYTES {
        return Err(IngestionError::payload_too_large(
            slot,
            size_bytes,
            MAX_FILE_BYTES,
        ));
    }
    if slot == Slot::Selfie && !image {
        return Err(IngestionError::invalid_slot_type(slot, declared_mime));
    }

    Ok(if image {
        ResourceCategory::Image
    } else {
        ResourceCategory::Document
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestionErrorKind;
    use proptest::prelude::*;

    #[test]
    fn images_are_images_in_every_slot() {
        for slot in Slot::ALL {
            assert_eq!(
                classify(slot, "image/jpeg", 2_000_000).unwrap(),
                ResourceCategory::Image
            );
        }
    }

    #[test]
    fn pdf_is_a_document_for_id_and_address() {
        assert_eq!(
            classify(Slot::Id, "application/pdf", 10).unwrap(),
            ResourceCategory::Document
        );
        assert_eq!(
            classify(Slot::Address, "application/pdf", 10).unwrap(),
            ResourceCategory::Document
        );
    }

    #[test]
    fn pdf_selfie_is_invalid_slot_type() {
        let err = classify(Slot::Selfie, "application/pdf", 10).unwrap_err();
        assert_eq!(err.kind, IngestionErrorKind::InvalidSlotType);
        assert_eq!(err.slot, Some(Slot::Selfie));
    }

    #[test]
    fn zip_is_unsupported() {
        let err = classify(Slot::Id, "application/zip", 10).unwrap_err();
        assert_eq!(err.kind, IngestionErrorKind::UnsupportedType);
    }

    #[test]
    fn size_cap_is_inclusive() {
        assert!(classify(Slot::Id, "image/png", MAX_FILE_BYTES).is_ok());
        let err = classify(Slot::Id, "image/png", MAX_FILE_BYTES + 1).unwrap_err();
        assert_eq!(err.kind, IngestionErrorKind::PayloadTooLarge);
    }

    #[test]
    fn unsupported_type_wins_over_size() {
        let err = classify(Slot::Id, "video/mp4", MAX_FILE_BYTES * 2).unwrap_err();
        assert_eq!(err.kind, IngestionErrorKind::UnsupportedType);
    }

    #[test]
    fn mime_parameters_and_case_are_ignored() {
        assert_eq!(normalize_mime("Image/PNG; charset=x"), "image/png");
        assert_eq!(
            classify(Slot::Selfie, "IMAGE/png; q=1", 1).unwrap(),
            ResourceCategory::Image
        );
        assert_eq!(
            classify(Slot::Id, "Application/PDF", 1).unwrap(),
            ResourceCategory::Document
        );
    }

    #[test]
    fn bare_image_prefix_is_unsupported() {
        assert!(classify(Slot::Id, "image/", 1).is_err());
        assert!(classify(Slot::Id, "", 1).is_err());
    }

    proptest! {
        #[test]
        fn non_image_non_pdf_is_always_unsupported(
            top in "[a-z]{1,12}",
            sub in "[a-z0-9.+-]{1,16}",
            size in 0u64..(MAX_FILE_BYTES * 2),
        ) {
            let mime = format!("{top}/{sub}");
            prop_assume!(top != "image" && mime != "application/pdf");
            for slot in Slot::ALL {
                let err = classify(slot, &mime, size).unwrap_err();
                prop_assert_eq!(err.kind, IngestionErrorKind::UnsupportedType);
            }
        }

        #[test]
        fn any_small_image_is_accepted(sub in "[a-z0-9.+-]{1,16}", size in 0u64..=MAX_FILE_BYTES) {
            let mime = format!("image/{sub}");
            for slot in Slot::ALL {
                prop_assert_eq!(classify(slot, &mime, size).unwrap(), ResourceCategory::Image);
            }
        }
    }
}
