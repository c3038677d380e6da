//! Integration tests for `ImageHostClient::upload`.
//!
//! Uses `wiremock` to stand up a local HTTP server so no real network
//! traffic is made.

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use matjar_storefront::config::ImageHostConfig;
use matjar_storefront::images::ImageHostClient;
use matjar_storefront::StorefrontError;

fn test_client(server: &MockServer) -> ImageHostClient {
    ImageHostClient::new(&ImageHostConfig {
        api_base: server.uri(),
        account_id: "acct-1".to_owned(),
        api_token: "test-token".to_owned(),
        delivery_url: "https://images.example/hash".to_owned(),
    })
    .expect("failed to build test ImageHostClient")
}

fn png_bytes() -> Vec<u8> {
    vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]
}

#[tokio::test]
async fn upload_returns_id_and_first_variant_url() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/accounts/acct-1/images/v1"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "success": true,
            "result": {
                "id": "img-123",
                "variants": [
                    "https://images.example/hash/img-123/public",
                    "https://images.example/hash/img-123/thumb"
                ]
            },
            "errors": []
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let hosted = client
        .upload(png_bytes(), "photo.png".to_owned(), "image/png")
        .await
        .expect("upload should succeed");

    assert_eq!(hosted.id, "img-123");
    assert_eq!(hosted.url, "https://images.example/hash/img-123/public");
    assert_eq!(hosted.variants.len(), 2);
}

#[tokio::test]
async fn upload_builds_delivery_url_when_no_variants_returned() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/accounts/acct-1/images/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "success": true,
            "result": { "id": "img-456", "variants": [] }
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let hosted = client
        .upload(png_bytes(), "photo.png".to_owned(), "image/png")
        .await
        .expect("upload should succeed");

    assert_eq!(hosted.url, "https://images.example/hash/img-456/public");
}

#[tokio::test]
async fn upstream_rejection_surfaces_status_and_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/accounts/acct-1/images/v1"))
        .respond_with(ResponseTemplate::new(400).set_body_json(&json!({
            "success": false,
            "errors": [{ "message": "file too large" }]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client
        .upload(png_bytes(), "photo.png".to_owned(), "image/png")
        .await
        .expect_err("upload should fail");

    match err {
        StorefrontError::CollaboratorRejected {
            status, message, ..
        } => {
            assert_eq!(status, 400);
            assert_eq!(message, "file too large");
        }
        other => panic!("expected CollaboratorRejected, got {other:?}"),
    }
}
