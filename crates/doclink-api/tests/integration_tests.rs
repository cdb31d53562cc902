//! Router-level tests: the full Axum app over in-memory stores and a fake
//! object storage, driven with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use doclink_api::auth::SecretToken;
use doclink_api::state::{AppConfig, AppState};
use doclink_core::{
    AccessType, DeliveryDescriptor, DirectUploadSignature, LinkStore, MemoryStore, NewLink,
    ObjectStorage, SignOptions, StorageBackend, StorageError, UploadOptions, UrlSigner,
};

const ADMIN_TOKEN: &str = "admin-secret";
const BOUNDARY: &str = "doclink-test-boundary";

// -- Fakes -------------------------------------------------------------------

/// Accepts every upload, except into folders ending with `fail_on`.
#[derive(Default)]
struct FakeStorage {
    fail_on: Option<&'static str>,
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn upload(
        &self,
        _bytes: Vec<u8>,
        options: &UploadOptions,
    ) -> Result<DeliveryDescriptor, StorageError> {
        if self
            .fail_on
            .is_some_and(|suffix| options.folder.ends_with(suffix))
        {
            return Err(StorageError::Rejected {
                status: 500,
                message: "storage unavailable".into(),
            });
        }
        let object_id = format!("{}/object", options.folder);
        Ok(DeliveryDescriptor {
            secure_url: format!(
                "https://cdn.test/demo/{}/upload/v1/{}",
                options.resource_category.storage_resource_type(),
                object_id
            ),
            object_id,
            resource_category: options.resource_category,
            access_type: AccessType::Upload,
            version: Some(1),
        })
    }
}

impl UrlSigner for FakeStorage {
    fn sign_url(
        &self,
        descriptor: &DeliveryDescriptor,
        _options: SignOptions,
    ) -> Result<String, StorageError> {
        Ok(format!(
            "https://cdn.test/demo/raw/upload/s--sig--/fl_inline/v1/{}",
            descriptor.object_id
        ))
    }

    fn sign_direct_upload(&self, folder: &str) -> Result<DirectUploadSignature, StorageError> {
        Ok(DirectUploadSignature {
            signature: "abc123".into(),
            timestamp: 1_700_000_000,
            folder: folder.into(),
            cloud_name: "demo".into(),
            api_key: "123456789".into(),
        })
    }
}

// -- Harness -----------------------------------------------------------------

struct Harness {
    app: Router,
    store: MemoryStore,
    state: AppState,
}

fn test_config() -> AppConfig {
    AppConfig {
        auth_token: Some(SecretToken::new(ADMIN_TOKEN.to_string())),
        verify_base_url: "https://verify.test".into(),
        ..AppConfig::default()
    }
}

fn harness(with_storage: bool) -> Harness {
    harness_with(test_config(), with_storage.then(FakeStorage::default))
}

fn harness_with(config: AppConfig, storage: Option<FakeStorage>) -> Harness {
    let store = MemoryStore::new();
    let storage = storage.map(|s| Arc::new(s) as Arc<dyn StorageBackend>);
    let state = AppState::with_stores(
        config,
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        storage,
    );
    Harness {
        app: doclink_api::app(state.clone()),
        store,
        state,
    }
}

async fn seed_link(store: &MemoryStore) -> String {
    let link = NewLink {
        name: "Jane".into(),
        surname: "Doe".into(),
        require_id: true,
        require_selfie: true,
        ..Default::default()
    }
    .into_link("https://verify.test")
    .unwrap();
    let token = link.token.as_str().to_string();
    store.create_link(link).await.unwrap();
    token
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File(name, content_type, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{name}.bin\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn submission_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/submissions")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn admin_json(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

// -- Probes ------------------------------------------------------------------

#[tokio::test]
async fn health_probes_answer_without_auth() {
    let h = harness(true);
    let resp = h
        .app
        .clone()
        .oneshot(Request::get("/health/liveness").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = h
        .app
        .clone()
        .oneshot(Request::get("/health/readiness").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn openapi_document_is_public() {
    let h = harness(false);
    let (status, body) = send(
        &h.app,
        Request::get("/openapi.json").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/v1/submissions"].is_object());
}

// -- Submissions -------------------------------------------------------------

#[tokio::test]
async fn submission_is_created_with_resolved_urls() {
    let h = harness(true);
    let token = seed_link(&h.store).await;

    let (status, body) = send(
        &h.app,
        submission_request(&[
            Part::Text("token", &token),
            Part::Text("idType", "passport"),
            Part::File("idFile", "application/pdf", b"%PDF-1.7"),
            Part::File("selfieFile", "image/jpeg", b"\xff\xd8\xff"),
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["success"], true);
    let data = &body["data"];
    assert_eq!(data["token"], token.as_str());
    assert_eq!(data["id_type"], "passport");
    assert_eq!(data["id_picture_category"], "document");
    assert!(data["id_picture_url"]
        .as_str()
        .unwrap()
        .contains("/s--sig--/fl_inline/"));
    assert_eq!(data["selfie_category"], "image");
    assert!(data["address_proof_picture_url"].is_null());
    assert_eq!(data["status"], "submitted");
    assert_eq!(h.store.submission_count(), 1);
    assert_eq!(h.state.metrics.ingestions("committed"), 1);
}

#[tokio::test]
async fn second_submission_for_token_is_conflict() {
    let h = harness(true);
    let token = seed_link(&h.store).await;
    let parts = [
        Part::Text("token", &token),
        Part::File("selfieFile", "image/png", b"\x89PNG"),
    ];

    let (first, _) = send(&h.app, submission_request(&parts)).await;
    assert_eq!(first, StatusCode::CREATED);

    let (second, body) = send(&h.app, submission_request(&parts)).await;
    assert_eq!(second, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DUPLICATE_SUBMISSION");
    assert_eq!(body["error"]["details"]["step"], "duplicate-check");
    assert_eq!(h.store.submission_count(), 1);
    assert_eq!(h.state.metrics.ingestions("duplicate_submission"), 1);
}

#[tokio::test]
async fn unknown_token_is_not_found() {
    let h = harness(true);
    let (status, body) = send(
        &h.app,
        submission_request(&[
            Part::Text("token", "no-such-token"),
            Part::File("selfieFile", "image/png", b"\x89PNG"),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert_eq!(body["error"]["details"]["step"], "token-validation");
}

#[tokio::test]
async fn missing_token_is_validation_error() {
    let h = harness(true);
    let (status, body) = send(
        &h.app,
        submission_request(&[Part::File("selfieFile", "image/png", b"\x89PNG")]),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"]["step"], "validation");
}

#[tokio::test]
async fn non_multipart_body_is_structured_validation_error() {
    let h = harness(true);
    let (status, body) = send(
        &h.app,
        Request::post("/v1/submissions")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"token":"abc"}"#))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"]["step"], "validation");
    assert_eq!(h.state.metrics.ingestions("validation_error"), 1);
}

#[tokio::test]
async fn padded_token_is_rejected_not_trimmed() {
    let h = harness(true);
    let token = seed_link(&h.store).await;
    let padded = format!("  {token}  ");
    let (status, body) = send(
        &h.app,
        submission_request(&[
            Part::Text("token", &padded),
            Part::File("selfieFile", "image/png", b"\x89PNG"),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["details"]["step"], "validation");
    assert_eq!(h.store.submission_count(), 0);
}

#[tokio::test]
async fn oversized_file_is_payload_too_large() {
    let h = harness(true);
    let token = seed_link(&h.store).await;
    let big = vec![0u8; 26_300_000];
    let (status, body) = send(
        &h.app,
        submission_request(&[
            Part::Text("token", &token),
            Part::File("idFile", "image/jpeg", &big),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
    assert_eq!(body["error"]["details"]["step"], "validation");
    assert_eq!(body["error"]["details"]["slot"], "id");
    assert_eq!(h.store.submission_count(), 0);
}

#[tokio::test]
async fn body_over_limit_is_payload_too_large_with_step() {
    let config = AppConfig {
        submission_body_limit: 1024,
        ..test_config()
    };
    let h = harness_with(config, Some(FakeStorage::default()));
    let token = seed_link(&h.store).await;
    let (status, body) = send(
        &h.app,
        submission_request(&[
            Part::Text("token", &token),
            Part::File("idFile", "image/jpeg", &[0u8; 8192]),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE, "{body}");
    assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
    assert_eq!(body["error"]["details"]["step"], "validation");
    assert_eq!(h.store.submission_count(), 0);
    assert_eq!(h.state.metrics.ingestions("payload_too_large"), 1);
}

#[tokio::test]
async fn failed_upload_is_bad_gateway_tagged_with_slot_step() {
    let h = harness_with(
        test_config(),
        Some(FakeStorage {
            fail_on: Some("/selfie"),
        }),
    );
    let token = seed_link(&h.store).await;
    let (status, body) = send(
        &h.app,
        submission_request(&[
            Part::Text("token", &token),
            Part::File("idFile", "image/jpeg", b"\xff\xd8\xff"),
            Part::File("selfieFile", "image/png", b"\x89PNG"),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "UPLOAD_FAILED");
    assert_eq!(body["error"]["details"]["step"], "selfie-upload");
    assert_eq!(body["error"]["details"]["slot"], "selfie");
    assert!(!body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("storage unavailable"));
    assert_eq!(h.store.submission_count(), 0);
    assert_eq!(h.state.metrics.ingestions("upload_failed"), 1);
}

#[tokio::test]
async fn unsupported_file_type_is_rejected_before_upload() {
    let h = harness(true);
    let token = seed_link(&h.store).await;
    let (status, body) = send(
        &h.app,
        submission_request(&[
            Part::Text("token", &token),
            Part::File("idFile", "application/zip", b"PK\x03\x04"),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "UNSUPPORTED_TYPE");
    assert_eq!(body["error"]["details"]["slot"], "id");
    assert_eq!(h.store.submission_count(), 0);
}

#[tokio::test]
async fn pdf_selfie_is_invalid_slot_type() {
    let h = harness(true);
    let token = seed_link(&h.store).await;
    let (status, body) = send(
        &h.app,
        submission_request(&[
            Part::Text("token", &token),
            Part::File("selfieFile", "application/pdf", b"%PDF"),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INVALID_SLOT_TYPE");
    assert_eq!(body["error"]["details"]["slot"], "selfie");
}

#[tokio::test]
async fn unknown_id_type_label_is_validation_error() {
    let h = harness(true);
    let token = seed_link(&h.store).await;
    let (status, body) = send(
        &h.app,
        submission_request(&[
            Part::Text("token", &token),
            Part::Text("idType", "library_card"),
            Part::File("idFile", "image/png", b"\x89PNG"),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn submissions_without_storage_are_unavailable() {
    let h = harness(false);
    let token = seed_link(&h.store).await;
    let (status, body) = send(
        &h.app,
        submission_request(&[
            Part::Text("token", &token),
            Part::File("selfieFile", "image/png", b"\x89PNG"),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
}

// -- Verify ------------------------------------------------------------------

#[tokio::test]
async fn verify_returns_link_and_submission() {
    let h = harness(true);
    let token = seed_link(&h.store).await;

    let (status, body) = send(
        &h.app,
        Request::get(format!("/v1/verify/{token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Jane");
    assert_eq!(body["require_selfie"], true);
    assert!(body["submission"].is_null());

    send(
        &h.app,
        submission_request(&[
            Part::Text("token", &token),
            Part::File("selfieFile", "image/png", b"\x89PNG"),
        ]),
    )
    .await;

    let (_, body) = send(
        &h.app,
        Request::get(format!("/v1/verify/{token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(body["submission"]["status"], "submitted");
}

#[tokio::test]
async fn verify_unknown_token_is_not_found() {
    let h = harness(true);
    let (status, _) = send(
        &h.app,
        Request::get("/v1/verify/unknown").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// -- Admin -------------------------------------------------------------------

#[tokio::test]
async fn admin_routes_require_bearer_token() {
    let h = harness(true);
    let (status, body) = send(
        &h.app,
        Request::get("/v1/links").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = send(
        &h.app,
        Request::get("/v1/links")
            .header(header::AUTHORIZATION, "Bearer wrong")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn link_lifecycle_create_list_delete() {
    let h = harness(true);

    let (status, created) = send(
        &h.app,
        admin_json(
            "POST",
            "/v1/links",
            Some(json!({
                "name": "  Ada ",
                "surname": "Lovelace",
                "email": "ada@example.com",
                "require_id": true
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["name"], "Ada");
    let token = created["token"].as_str().unwrap().to_string();
    assert_eq!(
        created["link"],
        format!("https://verify.test/verify/{token}")
    );

    seed_link(&h.store).await;

    let (status, page) = send(&h.app, admin_json("GET", "/v1/links?search=ADA", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["surname"], "Lovelace");

    let (_, page) = send(&h.app, admin_json("GET", "/v1/links?per_page=1", None)).await;
    assert_eq!(page["total"], 2);
    assert_eq!(page["per_page"], 1);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);

    let id = created["id"].as_str().unwrap();
    let resp = h
        .app
        .clone()
        .oneshot(admin_json("DELETE", &format!("/v1/links/{id}"), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let (status, _) = send(&h.app, admin_json("DELETE", &format!("/v1/links/{id}"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_link_without_name_is_validation_error() {
    let h = harness(true);
    let (status, body) = send(
        &h.app,
        admin_json("POST", "/v1/links", Some(json!({"name": " ", "surname": "X"}))),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn reviewer_updates_submission_status() {
    let h = harness(true);
    let token = seed_link(&h.store).await;
    let (_, created) = send(
        &h.app,
        submission_request(&[
            Part::Text("token", &token),
            Part::File("selfieFile", "image/png", b"\x89PNG"),
        ]),
    )
    .await;
    let id = created["data"]["id"].as_str().unwrap();

    let (status, body) = send(
        &h.app,
        admin_json(
            "PUT",
            &format!("/v1/submissions/{id}/status"),
            Some(json!({"status": "approved"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");

    let (status, _) = send(
        &h.app,
        admin_json(
            "PUT",
            &format!("/v1/submissions/{id}/status"),
            Some(json!({"status": "archived"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(
        &h.app,
        admin_json(
            "PUT",
            "/v1/submissions/00000000-0000-0000-0000-000000000000/status",
            Some(json!({"status": "rejected"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upload_signature_for_known_token() {
    let h = harness(true);
    let token = seed_link(&h.store).await;

    let (status, body) = send(
        &h.app,
        admin_json(
            "POST",
            "/v1/uploads/signature",
            Some(json!({ "token": token })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["folder"], token.as_str());
    assert_eq!(body["cloud_name"], "demo");

    let (status, _) = send(
        &h.app,
        admin_json(
            "POST",
            "/v1/uploads/signature",
            Some(json!({ "token": "not-a-link" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn metrics_endpoint_reports_requests() {
    let h = harness(true);
    send(
        &h.app,
        Request::get("/v1/verify/unknown").body(Body::empty()).unwrap(),
    )
    .await;

    let resp = h
        .app
        .clone()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let text = String::from_utf8(
        resp.into_body().collect().await.unwrap().to_bytes().to_vec(),
    )
    .unwrap();
    assert!(text.contains("doclink_http_requests_total"));
    assert!(text.contains("path=\"/v1/verify/:token\""));
    assert!(!text.contains("path=\"/v1/verify/unknown\""));
}
