//! HTTP surface of the review service.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use swipelabel_core::{
    AuthRequest, Image, ImageUrlRequest, ImageUrlResponse, ImagesQuery, Reviewer,
    SubmitReviewRequest, SubmitReviewResponse, AUTH_PATH, IMAGES_PATH, IMAGE_URL_PATH,
    SUBMIT_REVIEW_PATH,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::AppState;

/// Full application router with request tracing.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/help", get(help_handler))
        .merge(api_router())
        .fallback(not_found)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// The four review endpoints. Any verb other than the designated one is a
/// JSON 405.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(AUTH_PATH, post(authenticate).fallback(method_not_allowed))
        .route(IMAGES_PATH, get(unreviewed_images).fallback(method_not_allowed))
        .route(IMAGE_URL_PATH, post(image_url).fallback(method_not_allowed))
        .route(
            SUBMIT_REVIEW_PATH,
            post(submit_review).fallback(method_not_allowed),
        )
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "swipelabel"
    }))
}

async fn help_handler() -> Json<serde_json::Value> {
    Json(json!({
        "service": "swipelabel",
        "version": swipelabel_core::service_version(),
        "description": "Batch-scoped binary image review",
        "endpoints": [
            {
                "path": "/health",
                "method": "GET",
                "description": "Health check endpoint"
            },
            {
                "path": AUTH_PATH,
                "method": "POST",
                "description": "Authenticate a reviewer by email and password",
                "body": "{email, password}"
            },
            {
                "path": IMAGES_PATH,
                "method": "GET",
                "description": "Images in the reviewer's batch they have not reviewed, ascending by id",
                "query": "email"
            },
            {
                "path": IMAGE_URL_PATH,
                "method": "POST",
                "description": "Time-limited download URL for one image",
                "body": "{alle_ingestion_id, alle_media_key}"
            },
            {
                "path": SUBMIT_REVIEW_PATH,
                "method": "POST",
                "description": "Record a like (1) or dislike (0), once per image and reviewer",
                "body": "{alle_ingestion_id, review_score, reviewer_email}"
            }
        ],
        "configuration": {
            "required_env_vars": ["AWS_ACCESS_KEY", "AWS_SECRET_KEY", "S3_BUCKET"],
            "optional_env_vars": [
                "PORT (default: 3000)",
                "STATE_DIR (default: current directory)",
                "AWS_REGION (default: ap-south-1)",
                "STORE_TIMEOUT_SECS (default: 10)",
                "SIGNER_TIMEOUT_SECS (default: 10)",
                "CATALOG_IMPORT_PATH (default: none)"
            ]
        }
    }))
}

async fn authenticate(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AuthRequest>, JsonRejection>,
) -> Result<Json<Reviewer>, ApiError> {
    let Json(request) = body?;
    let reviewer = state.controller.authenticate(&request).await?;
    Ok(Json(reviewer))
}

async fn unreviewed_images(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ImagesQuery>, QueryRejection>,
) -> Result<Json<Vec<Image>>, ApiError> {
    let Query(query) = query?;
    let images = state.controller.unreviewed_images(&query).await?;
    Ok(Json(images))
}

async fn image_url(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ImageUrlRequest>, JsonRejection>,
) -> Result<Json<ImageUrlResponse>, ApiError> {
    let Json(request) = body?;
    let response = state.controller.image_url(&request).await?;
    Ok(Json(response))
}

async fn submit_review(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SubmitReviewRequest>, JsonRejection>,
) -> Result<Json<SubmitReviewResponse>, ApiError> {
    let Json(request) = body?;
    let response = state.controller.submit_review(&request).await?;
    Ok(Json(response))
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}

/// Resolves on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl-C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
