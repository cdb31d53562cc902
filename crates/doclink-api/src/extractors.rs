//! # Custom Extractors & Validation
//!
//! The [`Validate`] trait and JSON helpers for admin request DTOs, and
//! [`SubmissionForm`], the parsed multipart body of a document submission.

use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::Multipart;
use axum::http::StatusCode;
use axum::Json;
use doclink_core::{
    AddressProofType, DocumentUpload, IdType, IngestionError, SlotFile, SlotPayloads,
};

use crate::error::AppError;

/// Trait for request types that can validate their business rules
/// beyond what serde deserialization checks.
pub trait Validate {
    /// Validate business rules. Returns an error message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Content type assumed when a file part declares none.
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Multipart submission body.
///
/// Field names: `token`, `idType`, `idFile`, `selfieFile`,
/// `addressProofType`, `addressProofFile`. Unknown fields are ignored.
/// A file part with no bytes and no file name counts as absent, which is
/// what browsers send for an empty file input.
#[derive(Debug, Default)]
pub struct SubmissionForm {
    pub token: String,
    pub id_type: Option<String>,
    pub id_file: Option<SlotFile>,
    pub selfie_file: Option<SlotFile>,
    pub address_proof_type: Option<String>,
    pub address_proof_file: Option<SlotFile>,
}

impl SubmissionForm {
    /// Read every part of the multipart body. Extractor rejections and
    /// stream errors become ingestion errors at step `validation`.
    pub async fn from_multipart(
        multipart: Result<Multipart, MultipartRejection>,
    ) -> Result<Self, AppError> {
        let mut multipart = multipart.map_err(|rejection| {
            IngestionError::validation(format!("malformed multipart body: {}", rejection.body_text()))
        })?;
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match name.as_str() {
                "token" => form.token = field.text().await.map_err(multipart_error)?,
                "idType" => form.id_type = non_empty(field.text().await.map_err(multipart_error)?),
                "addressProofType" => {
                    form.address_proof_type =
                        non_empty(field.text().await.map_err(multipart_error)?)
                }
                "idFile" => form.id_file = read_file(field).await?,
                "selfieFile" => form.selfie_file = read_file(field).await?,
                "addressProofFile" => form.address_proof_file = read_file(field).await?,
                other => tracing::debug!(field = other, "ignoring unknown multipart field"),
            }
        }
        Ok(form)
    }

    /// Parse type labels and assemble the pipeline payload.
    ///
    /// A type label only travels with its file; a label without a file is
    /// dropped unparsed.
    pub fn into_payloads(self) -> Result<(String, SlotPayloads), AppError> {
        let payloads = SlotPayloads {
            id: labelled::<IdType>(self.id_type, self.id_file)?,
            selfie: self.selfie_file,
            address: labelled::<AddressProofType>(self.address_proof_type, self.address_proof_file)?,
        };
        Ok((self.token, payloads))
    }
}

fn labelled<L>(
    label: Option<String>,
    file: Option<SlotFile>,
) -> Result<Option<DocumentUpload<L>>, AppError>
where
    L: std::str::FromStr<Err = doclink_core::ValidationError>,
{
    let Some(file) = file else {
        return Ok(None);
    };
    let label = label
        .map(|value| value.parse::<L>())
        .transpose()
        .map_err(|e| IngestionError::validation(e.to_string()))?;
    Ok(Some(DocumentUpload { label, file }))
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

async fn read_file(field: Field<'_>) -> Result<Option<SlotFile>, AppError> {
    let content_type = field
        .content_type()
        .unwrap_or(FALLBACK_CONTENT_TYPE)
        .to_string();
    let file_name = field.file_name().map(str::to_string);
    let bytes = field.bytes().await.map_err(multipart_error)?;

    if bytes.is_empty() && file_name.as_deref().map_or(true, str::is_empty) {
        return Ok(None);
    }
    let file = SlotFile::new(bytes.to_vec(), content_type);
    Ok(Some(match file_name.filter(|n| !n.is_empty()) {
        Some(name) => file.with_file_name(name),
        None => file,
    }))
}

fn multipart_error(err: MultipartError) -> AppError {
    let ingestion = if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        IngestionError::request_too_large(format!("request body too large: {}", err.body_text()))
    } else {
        IngestionError::validation(format!("malformed multipart body: {}", err.body_text()))
    };
    ingestion.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use doclink_core::IngestionErrorKind;

    #[test]
    fn labels_are_attached_to_their_files() {
        let form = SubmissionForm {
            token: "T1".into(),
            id_type: Some("passport".into()),
            id_file: Some(SlotFile::new(vec![1], "image/png")),
            address_proof_type: Some("utility_bill".into()),
            ..Default::default()
        };
        let (token, payloads) = form.into_payloads().unwrap();
        assert_eq!(token, "T1");
        assert_eq!(payloads.id.unwrap().label, Some(IdType::Passport));
        assert!(payloads.address.is_none());
    }

    #[test]
    fn unknown_label_is_a_validation_error() {
        let form = SubmissionForm {
            id_type: Some("library_card".into()),
            id_file: Some(SlotFile::new(vec![1], "image/png")),
            ..Default::default()
        };
        match form.into_payloads() {
            Err(AppError::Ingestion(err)) => {
                assert_eq!(err.kind, IngestionErrorKind::Validation);
            }
            other => panic!("expected ingestion validation error, got {other:?}"),
        }
    }

    #[test]
    fn label_without_file_is_dropped_unparsed() {
        let form = SubmissionForm {
            token: "T1".into(),
            id_type: Some("library_card".into()),
            address_proof_type: Some("postcard".into()),
            selfie_file: Some(SlotFile::new(vec![1], "image/png")),
            ..Default::default()
        };
        let (_, payloads) = form.into_payloads().unwrap();
        assert!(payloads.id.is_none());
        assert!(payloads.address.is_none());
        assert!(payloads.selfie.is_some());
    }

    #[test]
    fn non_empty_trims() {
        assert_eq!(non_empty("  ".into()), None);
        assert_eq!(non_empty(" passport ".into()).as_deref(), Some("passport"));
    }
}
