//! Typed client for the object storage upload API.
//!
//! Endpoints used:
//! - `POST {api}/v1_1/{cloud}/{image|raw}/upload` (multipart, signed)
//! - `GET  {api}/v1_1/{cloud}/ping` (basic auth)

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use doclink_core::{
    AccessType, DeliveryDescriptor, DirectUploadSignature, ObjectStorage, SignOptions,
    StorageError, UploadOptions, UrlSigner,
};

use crate::config::StorageConfig;
use crate::error::{error_message, StorageApiError};
use crate::signing::{sign_params, signed_delivery_url};

/// Fields of the upload response this client relies on.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    /// Object id, including the folder.
    pub public_id: String,
    /// Object version.
    #[serde(default)]
    pub version: Option<u64>,
    /// Unsigned HTTPS delivery URL.
    pub secure_url: String,
    /// `image` or `raw`.
    #[serde(default)]
    pub resource_type: Option<String>,
    /// Delivery type: `upload`, `private` or `authenticated`.
    #[serde(rename = "type", default)]
    pub delivery_type: Option<String>,
    /// Stored size in bytes.
    #[serde(default)]
    pub bytes: Option<u64>,
}

/// Client for the object storage REST API.
#[derive(Debug, Clone)]
pub struct StorageClient {
    http: reqwest::Client,
    config: Arc<StorageConfig>,
}

impl StorageClient {
    /// Create a new storage client from configuration.
    pub fn new(config: StorageConfig) -> Result<Self, StorageApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StorageApiError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;
        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    /// Access the configuration.
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Upload `bytes` with a signed multipart request.
    pub async fn upload_object(
        &self,
        bytes: Vec<u8>,
        options: &UploadOptions,
    ) -> Result<UploadResponse, StorageApiError> {
        let resource_type = options.resource_category.storage_resource_type();
        let endpoint = format!("POST /{resource_type}/upload");
        let url = format!(
            "{}/v1_1/{}/{resource_type}/upload",
            self.config.api_base(),
            self.config.cloud_name
        );

        let access_mode = if options.public {
            "public"
        } else {
            "authenticated"
        };
        let mut params = BTreeMap::new();
        params.insert("access_mode", access_mode.to_string());
        params.insert("folder", options.folder.clone());
        params.insert("timestamp", chrono::Utc::now().timestamp().to_string());
        params.insert("type", "upload".to_string());
        let signature = sign_params(&params, &self.config.api_secret);

        let file_name = options
            .file_name
            .clone()
            .unwrap_or_else(|| "upload".to_string());
        let mut form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));
        for (key, value) in params {
            form = form.text(key, value);
        }
        let form = form
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let resp = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| StorageApiError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(StorageApiError::ApiError {
                endpoint,
                status,
                message: error_message(&body),
            });
        }

        resp.json().await.map_err(|e| StorageApiError::Deserialization {
            endpoint,
            source: e,
        })
    }

    /// Check that the API is reachable and accepts the configured credentials.
    pub async fn ping(&self) -> Result<(), StorageApiError> {
        let endpoint = "GET /ping".to_string();
        let url = format!(
            "{}/v1_1/{}/ping",
            self.config.api_base(),
            self.config.cloud_name
        );

        let resp = self
            .http
            .get(&url)
            .basic_auth(&self.config.api_key, Some(self.config.api_secret.as_str()))
            .send()
            .await
            .map_err(|e| StorageApiError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(StorageApiError::ApiError {
                endpoint,
                status,
                message: error_message(&body),
            });
        }
        Ok(())
    }

    /// Signed delivery URL for an uploaded object.
    pub fn signed_url(&self, descriptor: &DeliveryDescriptor, inline: bool) -> String {
        signed_delivery_url(
            self.config.delivery_base(),
            &self.config.cloud_name,
            descriptor,
            inline,
            &self.config.api_secret,
        )
    }

    /// Signature allowing a browser to upload directly into `folder`.
    pub fn direct_upload_signature(&self, folder: &str) -> DirectUploadSignature {
        let timestamp = chrono::Utc::now().timestamp();
        let mut params = BTreeMap::new();
        params.insert("folder", folder.to_string());
        params.insert("timestamp", timestamp.to_string());
        DirectUploadSignature {
            signature: sign_params(&params, &self.config.api_secret),
            timestamp,
            folder: folder.to_string(),
            cloud_name: self.config.cloud_name.clone(),
            api_key: self.config.api_key.clone(),
        }
    }
}

fn descriptor_from(
    response: UploadResponse,
    options: &UploadOptions,
) -> Result<DeliveryDescriptor, StorageApiError> {
    let access_type = match response.delivery_type.as_deref() {
        None | Some("upload") => AccessType::Upload,
        Some("private") => AccessType::Private,
        Some("authenticated") => AccessType::Authenticated,
        Some(other) => {
            return Err(StorageApiError::UnexpectedResponse {
                endpoint: "upload".into(),
                reason: format!("unknown delivery type '{other}'"),
            })
        }
    };
    Ok(DeliveryDescriptor {
        object_id: response.public_id,
        resource_category: options.resource_category,
        access_type,
        secure_url: response.secure_url,
        version: response.version,
    })
}

#[async_trait]
impl ObjectStorage for StorageClient {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        options: &UploadOptions,
    ) -> Result<DeliveryDescriptor, StorageError> {
        let response = self.upload_object(bytes, options).await?;
        tracing::debug!(
            folder = %options.folder,
            resource_type = response.resource_type.as_deref().unwrap_or("unknown"),
            bytes = response.bytes.unwrap_or_default(),
            "object uploaded"
        );
        Ok(descriptor_from(response, options)?)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(StorageClient::ping(self).await?)
    }
}

impl UrlSigner for StorageClient {
    fn sign_url(
        &self,
        descriptor: &DeliveryDescriptor,
        options: SignOptions,
    ) -> Result<String, StorageError> {
        Ok(self.signed_url(descriptor, options.inline))
    }

    fn sign_direct_upload(&self, folder: &str) -> Result<DirectUploadSignature, StorageError> {
        Ok(self.direct_upload_signature(folder))
    }
}
