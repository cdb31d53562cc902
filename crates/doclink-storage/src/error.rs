//! Storage client error types.

use doclink_core::StorageError;

/// Errors from object storage API calls.
#[derive(Debug, thiserror::Error)]
pub enum StorageApiError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Storage returned a non-2xx status.
    #[error("storage {endpoint} returned {status}: {message}")]
    ApiError {
        endpoint: String,
        status: u16,
        message: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Storage answered 2xx with a body we cannot use.
    #[error("unexpected response from {endpoint}: {reason}")]
    UnexpectedResponse { endpoint: String, reason: String },
}

impl From<StorageApiError> for StorageError {
    fn from(err: StorageApiError) -> Self {
        match err {
            StorageApiError::Http { .. } => Self::Transport(err.to_string()),
            StorageApiError::ApiError {
                status, message, ..
            } => Self::Rejected { status, message },
            StorageApiError::Deserialization { .. } | StorageApiError::UnexpectedResponse { .. } => {
                Self::InvalidResponse(err.to_string())
            }
        }
    }
}

/// Pull the human-readable message out of an error body of the form
/// `{"error": {"message": "..."}}`, falling back to the raw body.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(512).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_extracts_nested_message() {
        assert_eq!(
            error_message(r#"{"error":{"message":"Invalid Signature"}}"#),
            "Invalid Signature"
        );
    }

    #[test]
    fn error_message_falls_back_to_body() {
        assert_eq!(error_message("gateway timeout"), "gateway timeout");
    }

    #[test]
    fn api_error_converts_to_rejected() {
        let err: StorageError = StorageApiError::ApiError {
            endpoint: "POST /image/upload".into(),
            status: 401,
            message: "bad key".into(),
        }
        .into();
        assert_eq!(
            err,
            StorageError::Rejected {
                status: 401,
                message: "bad key".into()
            }
        );
    }
}
