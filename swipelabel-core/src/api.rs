//! Wire types for the review HTTP API.
//!
//! Every request body field is optional on the wire so that a missing field
//! can be reported as a structured `400` instead of a deserialization failure.
//! `validate` turns a raw request into the typed input the server works with;
//! no store access happens before validation succeeds.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{InvalidScore, ReviewScore};

pub const AUTH_PATH: &str = "/api/auth";
pub const IMAGES_PATH: &str = "/api/images";
pub const IMAGE_URL_PATH: &str = "/api/gen-s3-url";
pub const SUBMIT_REVIEW_PATH: &str = "/api/submit-review";

/// Maximum number of images returned by one unreviewed-image fetch.
pub const UNREVIEWED_FETCH_LIMIT: usize = 300;

/// Validity window of every issued image URL (7 days).
pub const SIGNED_URL_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

pub const REVIEW_SUBMITTED_MESSAGE: &str = "Review submitted successfully";

/// Why a request could not be turned into typed input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// One or more required fields were absent or empty.
    /// Maps each required field to whether it was present.
    #[error("Missing required fields")]
    MissingFields(BTreeMap<&'static str, bool>),

    #[error("Invalid review score")]
    InvalidScore(#[from] InvalidScore),
}

/// Returns the field if it is a non-empty string.
fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

fn missing(fields: &[(&'static str, bool)]) -> RequestError {
    RequestError::MissingFields(fields.iter().copied().collect())
}

// =============================================================================
// Authenticate
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl AuthRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    pub fn validate(&self) -> Result<Credentials, RequestError> {
        match (present(&self.email), present(&self.password)) {
            (Some(email), Some(password)) => Ok(Credentials {
                email: email.to_string(),
                password: password.to_string(),
            }),
            (email, password) => Err(missing(&[
                ("email", email.is_some()),
                ("password", password.is_some()),
            ])),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"****")
            .finish()
    }
}

// =============================================================================
// Fetch unreviewed images
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImagesQuery {
    #[serde(default)]
    pub email: Option<String>,
}

impl ImagesQuery {
    pub fn validate(&self) -> Result<&str, RequestError> {
        present(&self.email).ok_or_else(|| missing(&[("email", false)]))
    }
}

// =============================================================================
// Issue image access URL
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageUrlRequest {
    #[serde(default)]
    pub alle_ingestion_id: Option<String>,
    #[serde(default)]
    pub alle_media_key: Option<String>,
}

impl ImageUrlRequest {
    pub fn new(ingestion_id: impl Into<String>, media_key: impl Into<String>) -> Self {
        Self {
            alle_ingestion_id: Some(ingestion_id.into()),
            alle_media_key: Some(media_key.into()),
        }
    }

    pub fn validate(&self) -> Result<ImageObjectRef, RequestError> {
        match (
            present(&self.alle_ingestion_id),
            present(&self.alle_media_key),
        ) {
            (Some(ingestion_id), Some(media_key)) => Ok(ImageObjectRef {
                ingestion_id: ingestion_id.to_string(),
                media_key: media_key.to_string(),
            }),
            (ingestion_id, media_key) => Err(missing(&[
                ("alle_ingestion_id", ingestion_id.is_some()),
                ("alle_media_key", media_key.is_some()),
            ])),
        }
    }
}

/// Location of an image object in storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageObjectRef {
    pub ingestion_id: String,
    pub media_key: String,
}

impl ImageObjectRef {
    /// Storage key: `<ingestion_id>/<media_key>`.
    pub fn object_key(&self) -> String {
        format!("{}/{}", self.ingestion_id, self.media_key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrlResponse {
    pub url: String,
}

// =============================================================================
// Submit review
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitReviewRequest {
    #[serde(default)]
    pub alle_ingestion_id: Option<String>,
    /// Raw score; `Some(0)` is a real value and distinct from absent.
    #[serde(default)]
    pub review_score: Option<i64>,
    #[serde(default)]
    pub reviewer_email: Option<String>,
}

impl SubmitReviewRequest {
    pub fn new(
        ingestion_id: impl Into<String>,
        score: ReviewScore,
        reviewer_email: impl Into<String>,
    ) -> Self {
        Self {
            alle_ingestion_id: Some(ingestion_id.into()),
            review_score: Some(score.into()),
            reviewer_email: Some(reviewer_email.into()),
        }
    }

    pub fn validate(&self) -> Result<NewReview, RequestError> {
        let ingestion_id = present(&self.alle_ingestion_id);
        let reviewer_email = present(&self.reviewer_email);

        match (ingestion_id, self.review_score, reviewer_email) {
            (Some(ingestion_id), Some(raw_score), Some(reviewer_email)) => Ok(NewReview {
                alle_ingestion_id: ingestion_id.to_string(),
                review_score: ReviewScore::try_from(raw_score)?,
                reviewer_email: reviewer_email.to_string(),
            }),
            (ingestion_id, raw_score, reviewer_email) => Err(missing(&[
                ("alle_ingestion_id", ingestion_id.is_some()),
                ("review_score", raw_score.is_some()),
                ("reviewer_email", reviewer_email.is_some()),
            ])),
        }
    }
}

/// A validated review waiting to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub alle_ingestion_id: String,
    pub review_score: ReviewScore,
    pub reviewer_email: String,
}

/// Identity of an inserted review row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertResult {
    pub insert_id: i64,
    pub affected_rows: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReviewResponse {
    pub message: String,
    pub result: InsertResult,
}

impl SubmitReviewResponse {
    pub fn submitted(result: InsertResult) -> Self {
        Self {
            message: REVIEW_SUBMITTED_MESSAGE.to_string(),
            result,
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Stable machine-readable error code carried next to the human message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    BadRequest,
    InvalidCredentials,
    NotFound,
    DuplicateReview,
    MethodNotAllowed,
    InternalError,
}

/// JSON body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: ErrorCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
