//! Contract tests for StorageClient against a wiremock server.
//!
//! Verifies upload paths per resource category, the signed form fields,
//! error mapping, and the ping endpoint.

use doclink_core::{
    AccessType, ObjectStorage, ResourceCategory, SignOptions, StorageError, UploadOptions,
    UrlSigner,
};
use doclink_storage::{StorageApiError, StorageClient, StorageConfig};
use wiremock::matchers::{body_string_contains, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> StorageClient {
    StorageClient::new(StorageConfig::local_mock(&server.uri(), "test-secret").unwrap()).unwrap()
}

fn options(folder: &str, category: ResourceCategory) -> UploadOptions {
    UploadOptions {
        folder: folder.into(),
        resource_category: category,
        public: true,
        file_name: Some("doc.bin".into()),
    }
}

fn upload_body(public_id: &str, resource_type: &str) -> serde_json::Value {
    serde_json::json!({
        "public_id": public_id,
        "version": 1700000000,
        "secure_url": format!("https://res.test/demo/{resource_type}/upload/v1700000000/{public_id}"),
        "resource_type": resource_type,
        "type": "upload",
        "access_mode": "public",
        "bytes": 4
    })
}

#[tokio::test]
async fn image_upload_posts_signed_form_to_image_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1_1/demo/image/upload"))
        .and(body_string_contains("name=\"signature\""))
        .and(body_string_contains("name=\"api_key\""))
        .and(body_string_contains("tok/id"))
        .and(body_string_contains("public"))
        .respond_with(ResponseTemplate::new(200).set_body_json(upload_body("tok/id/a1", "image")))
        .expect(1)
        .mount(&server)
        .await;

    let descriptor = client(&server)
        .upload(vec![1, 2, 3, 4], &options("tok/id", ResourceCategory::Image))
        .await
        .unwrap();

    assert_eq!(descriptor.object_id, "tok/id/a1");
    assert_eq!(descriptor.resource_category, ResourceCategory::Image);
    assert_eq!(descriptor.access_type, AccessType::Upload);
    assert_eq!(descriptor.version, Some(1_700_000_000));
}

#[tokio::test]
async fn pdf_upload_goes_to_raw_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1_1/demo/raw/upload"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(upload_body("tok/address/b.pdf", "raw")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let descriptor = client(&server)
        .upload(vec![0; 4], &options("tok/address", ResourceCategory::Document))
        .await
        .unwrap();
    assert_eq!(descriptor.resource_category, ResourceCategory::Document);
}

#[tokio::test]
async fn rejected_upload_surfaces_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({"error": {"message": "Invalid Signature"}})),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .upload(vec![0; 4], &options("tok/id", ResourceCategory::Image))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        StorageError::Rejected {
            status: 401,
            message: "Invalid Signature".into()
        }
    );
}

#[tokio::test]
async fn malformed_success_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client(&server)
        .upload(vec![0; 4], &options("tok/id", ResourceCategory::Image))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidResponse(_)));
}

#[tokio::test]
async fn upload_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server)
        .upload(vec![0; 4], &options("tok/id", ResourceCategory::Image))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn unreachable_storage_is_transport_error() {
    let config = StorageConfig::local_mock("http://127.0.0.1:1", "s").unwrap();
    let err = StorageClient::new(config)
        .unwrap()
        .upload(vec![0; 4], &options("tok/id", ResourceCategory::Image))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Transport(_)));
}

#[tokio::test]
async fn ping_uses_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1_1/demo/ping"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).ping().await.unwrap();
}

#[tokio::test]
async fn ping_failure_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1_1/demo/ping"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;

    let err = client(&server).ping().await.unwrap_err();
    assert!(matches!(err, StorageApiError::ApiError { status: 401, .. }));
}

#[tokio::test]
async fn uploaded_pdf_gets_signed_inline_delivery_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1_1/demo/raw/upload"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(upload_body("tok/id/p.pdf", "raw")),
        )
        .mount(&server)
        .await;

    let client = client(&server);
    let descriptor = client
        .upload(vec![0; 4], &options("tok/id", ResourceCategory::Document))
        .await
        .unwrap();
    let url = client
        .sign_url(&descriptor, SignOptions { inline: true })
        .unwrap();

    assert!(url.starts_with(&format!("{}/demo/raw/upload/s--", server.uri())));
    assert!(url.contains("--/fl_inline/v1700000000/tok/id/p.pdf"));
    assert_ne!(url, descriptor.secure_url);
    assert_eq!(
        url,
        client
            .sign_url(&descriptor, SignOptions { inline: true })
            .unwrap()
    );
}
