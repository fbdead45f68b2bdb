//! Review API client.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use swipelabel_core::{
    AuthRequest, Credentials, ErrorBody, ErrorCode, Image, ImageUrlRequest, ImageUrlResponse,
    Reviewer, SubmitReviewRequest, SubmitReviewResponse, AUTH_PATH, IMAGES_PATH, IMAGE_URL_PATH,
    SUBMIT_REVIEW_PATH,
};
use thiserror::Error;

/// Why an API call did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiFailure {
    /// Non-2xx response. `message` is the server's `error` text, unchanged.
    #[error("{message}")]
    Status {
        status: u16,
        code: Option<ErrorCode>,
        message: String,
    },

    #[error("Could not reach the review server: {0}")]
    Transport(String),

    #[error("Unexpected response from the review server: {0}")]
    Decode(String),
}

impl ApiFailure {
    pub fn is_duplicate_review(&self) -> bool {
        matches!(
            self,
            ApiFailure::Status {
                code: Some(ErrorCode::DuplicateReview),
                ..
            }
        )
    }
}

#[async_trait]
pub trait ReviewApi: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Reviewer, ApiFailure>;

    async fn unreviewed_images(&self, email: &str) -> Result<Vec<Image>, ApiFailure>;

    async fn image_url(&self, image: &Image) -> Result<String, ApiFailure>;

    async fn submit_review(
        &self,
        request: &SubmitReviewRequest,
    ) -> Result<SubmitReviewResponse, ApiFailure>;
}

/// `ReviewApi` over HTTP with JSON bodies.
pub struct HttpReviewApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpReviewApi {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

async fn decode<T: DeserializeOwned>(
    response: Result<reqwest::Response, reqwest::Error>,
) -> Result<T, ApiFailure> {
    let response = response.map_err(|e| ApiFailure::Transport(e.to_string()))?;
    let status = response.status();

    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| ApiFailure::Decode(e.to_string()));
    }

    let text = response
        .text()
        .await
        .map_err(|e| ApiFailure::Transport(e.to_string()))?;

    Err(match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => ApiFailure::Status {
            status: status.as_u16(),
            code: Some(body.code),
            message: body.error,
        },
        Err(_) => ApiFailure::Status {
            status: status.as_u16(),
            code: None,
            message: if text.trim().is_empty() {
                status.to_string()
            } else {
                text
            },
        },
    })
}

#[async_trait]
impl ReviewApi for HttpReviewApi {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Reviewer, ApiFailure> {
        let body = AuthRequest::new(credentials.email.as_str(), credentials.password.as_str());
        decode(
            self.client
                .post(self.url(AUTH_PATH))
                .json(&body)
                .send()
                .await,
        )
        .await
    }

    async fn unreviewed_images(&self, email: &str) -> Result<Vec<Image>, ApiFailure> {
        decode(
            self.client
                .get(self.url(IMAGES_PATH))
                .query(&[("email", email)])
                .send()
                .await,
        )
        .await
    }

    async fn image_url(&self, image: &Image) -> Result<String, ApiFailure> {
        let body = ImageUrlRequest::new(
            image.alle_ingestion_id.as_str(),
            image.alle_media_key.as_str(),
        );
        let response: ImageUrlResponse = decode(
            self.client
                .post(self.url(IMAGE_URL_PATH))
                .json(&body)
                .send()
                .await,
        )
        .await?;
        Ok(response.url)
    }

    async fn submit_review(
        &self,
        request: &SubmitReviewRequest,
    ) -> Result<SubmitReviewResponse, ApiFailure> {
        decode(
            self.client
                .post(self.url(SUBMIT_REVIEW_PATH))
                .json(request)
                .send()
                .await,
        )
        .await
    }
}
