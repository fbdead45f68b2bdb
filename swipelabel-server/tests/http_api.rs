use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use swipelabel_core::Image;
use swipelabel_server::repository::{CatalogImport, ReviewerAccount};
use swipelabel_server::{
    http, AppState, InMemoryRepository, ReviewController, ReviewRepository, Timeouts, UrlSigner,
};

struct StaticSigner;

#[async_trait]
impl UrlSigner for StaticSigner {
    async fn signed_url(&self, object_key: &str, expires_in: Duration) -> anyhow::Result<String> {
        Ok(format!(
            "https://bucket.test/{}?X-Amz-Expires={}",
            object_key,
            expires_in.as_secs()
        ))
    }
}

fn image(id: i64, batch: i64) -> Image {
    Image {
        id,
        alle_ingestion_id: format!("ing-{}", id),
        alle_media_key: format!("media/{}.jpg", id),
        assigned_batch: batch,
    }
}

async fn app() -> Router {
    let repo = InMemoryRepository::new();
    repo.import_catalog(&CatalogImport {
        reviewers: vec![ReviewerAccount {
            email: "a@x.com".to_string(),
            password: "pw1".to_string(),
            batch_number: 5,
        }],
        images: vec![image(12, 5), image(7, 5), image(9, 5), image(3, 2)],
    })
    .await
    .unwrap();

    let controller = ReviewController::new(
        Arc::new(repo),
        Arc::new(StaticSigner),
        Timeouts::default(),
    );
    http::app(Arc::new(AppState::new(controller)))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_help_lists_review_endpoints() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/help", None).await;
    assert_eq!(status, StatusCode::OK);

    let paths: Vec<&str> = body["endpoints"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["path"].as_str())
        .collect();
    assert!(paths.contains(&"/api/submit-review"));
    assert!(paths.contains(&"/api/gen-s3-url"));
}

#[tokio::test]
async fn test_authenticate_success() {
    let app = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth",
        Some(json!({"email": "a@x.com", "password": "pw1"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"email": "a@x.com", "batch_number": 5}));
}

#[tokio::test]
async fn test_authenticate_wrong_password_is_401() {
    let app = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth",
        Some(json!({"email": "a@x.com", "password": "nope"})),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "invalid_credentials");
    assert_eq!(body["details"], "No matching user found");
}

#[tokio::test]
async fn test_authenticate_missing_password_is_400() {
    let app = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth",
        Some(json!({"email": "a@x.com"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing credentials");
    assert_eq!(body["details"], json!({"email": true, "password": false}));
}

#[tokio::test]
async fn test_wrong_verb_is_json_405() {
    let app = app().await;

    for (method, uri) in [
        (Method::GET, "/api/auth"),
        (Method::POST, "/api/images?email=a@x.com"),
        (Method::GET, "/api/gen-s3-url"),
        (Method::PUT, "/api/submit-review"),
        (Method::DELETE, "/api/submit-review"),
    ] {
        let (status, body) = send(&app, method.clone(), uri, None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{} {}", method, uri);
        assert_eq!(body["error"], "Method not allowed");
        assert_eq!(body["code"], "method_not_allowed");
    }
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let app = app().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn test_images_ascending_for_batch() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/api/images?email=a@x.com", None).await;
    assert_eq!(status, StatusCode::OK);

    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![7, 9, 12]);
    assert_eq!(body[0]["alle_media_key"], "media/7.jpg");
    assert_eq!(body[0]["assigned_batch"], 5);
}

#[tokio::test]
async fn test_images_without_email_is_400() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/api/images", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email is required");
}

#[tokio::test]
async fn test_images_unknown_user_is_404() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/api/images?email=nobody@x.com", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn test_image_url() {
    let app = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/gen-s3-url",
        Some(json!({"alle_ingestion_id": "ing-7", "alle_media_key": "media/7.jpg"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["url"],
        "https://bucket.test/ing-7/media/7.jpg?X-Amz-Expires=604800"
    );
}

#[tokio::test]
async fn test_zero_score_is_accepted_then_duplicate() {
    let app = app().await;
    let review = json!({
        "alle_ingestion_id": "ing-7",
        "review_score": 0,
        "reviewer_email": "a@x.com"
    });

    let (status, body) = send(&app, Method::POST, "/api/submit-review", Some(review.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Review submitted successfully");
    assert_eq!(body["result"]["affectedRows"], 1);
    assert!(body["result"]["insertId"].as_i64().unwrap() > 0);

    let (status, body) = send(&app, Method::POST, "/api/submit-review", Some(review)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You have already reviewed this image");
    assert_eq!(body["code"], "duplicate_review");

    let (_, images) = send(&app, Method::GET, "/api/images?email=a@x.com", None).await;
    let ids: Vec<i64> = images
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![9, 12]);
}

#[tokio::test]
async fn test_null_score_is_missing() {
    let app = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/submit-review",
        Some(json!({
            "alle_ingestion_id": "ing-7",
            "review_score": null,
            "reviewer_email": "a@x.com"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields");
    assert_eq!(body["details"]["review_score"], false);
    assert_eq!(body["details"]["alle_ingestion_id"], true);
}

#[tokio::test]
async fn test_score_out_of_range_is_400() {
    let app = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/submit-review",
        Some(json!({
            "alle_ingestion_id": "ing-7",
            "review_score": 2,
            "reviewer_email": "a@x.com"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid review score");
}
