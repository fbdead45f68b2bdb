//! Review API operations, independent of the HTTP layer.
//!
//! Each operation validates its input, makes bounded calls to the repository
//! or the URL signer, and maps the outcome onto an `ApiError`. Causes of
//! internal failures are logged here and never returned to the caller.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use swipelabel_core::{
    AuthRequest, Image, ImageUrlRequest, ImageUrlResponse, ImagesQuery, Reviewer,
    SubmitReviewRequest, SubmitReviewResponse, SIGNED_URL_TTL, UNREVIEWED_FETCH_LIMIT,
};
use tracing::{error, info, warn};

use crate::error::ApiError;
use crate::repository::{InsertOutcome, RepositoryError, ReviewRepository};
use crate::signer::UrlSigner;

/// Upper bounds on calls to external collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub store: Duration,
    pub signer: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            store: Duration::from_secs(10),
            signer: Duration::from_secs(10),
        }
    }
}

pub struct ReviewController {
    repository: Arc<dyn ReviewRepository>,
    signer: Arc<dyn UrlSigner>,
    timeouts: Timeouts,
}

impl ReviewController {
    pub fn new(
        repository: Arc<dyn ReviewRepository>,
        signer: Arc<dyn UrlSigner>,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            repository,
            signer,
            timeouts,
        }
    }

    async fn store<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, RepositoryError>>,
    ) -> Result<T, RepositoryError> {
        match tokio::time::timeout(self.timeouts.store, call).await {
            Ok(result) => result,
            Err(_) => Err(RepositoryError::Timeout {
                operation,
                elapsed: self.timeouts.store,
            }),
        }
    }

    /// Check credentials and return the matching reviewer.
    pub async fn authenticate(&self, request: &AuthRequest) -> Result<Reviewer, ApiError> {
        let credentials = request.validate().map_err(|e| {
            warn!("Rejected auth request: {}", e);
            ApiError::invalid_request("Missing credentials", e)
        })?;

        info!("Authenticating reviewer {}", credentials.email);

        let found = self
            .store("find_reviewer", self.repository.find_reviewer(&credentials))
            .await
            .map_err(|e| {
                error!("Authentication lookup failed for {}: {}", credentials.email, e);
                ApiError::Internal("Authentication failed")
            })?;

        match found {
            Some(reviewer) => {
                info!(
                    "Reviewer {} authenticated (batch {})",
                    reviewer.email, reviewer.batch_number
                );
                Ok(reviewer)
            }
            None => {
                warn!("No reviewer matches credentials for {}", credentials.email);
                Err(ApiError::InvalidCredentials)
            }
        }
    }

    /// Images in the reviewer's batch they have not reviewed yet, ascending by id.
    pub async fn unreviewed_images(&self, query: &ImagesQuery) -> Result<Vec<Image>, ApiError> {
        let email = query.validate().map_err(|e| {
            warn!("Rejected images request: {}", e);
            ApiError::invalid_request("Email is required", e)
        })?;

        let batch_number = self
            .store("batch_number", self.repository.batch_number(email))
            .await
            .map_err(|e| {
                error!("Batch lookup failed for {}: {}", email, e);
                ApiError::Internal("Failed to load images")
            })?
            .ok_or_else(|| {
                warn!("Images requested for unknown reviewer {}", email);
                ApiError::NotFound("User not found".to_string())
            })?;

        let images = self
            .store(
                "unreviewed_images",
                self.repository
                    .unreviewed_images(email, batch_number, UNREVIEWED_FETCH_LIMIT),
            )
            .await
            .map_err(|e| {
                error!("Loading unreviewed images failed for {}: {}", email, e);
                ApiError::Internal("Failed to load images")
            })?;

        info!(
            "Returning {} unreviewed images from batch {} for {}",
            images.len(),
            batch_number,
            email
        );
        Ok(images)
    }

    /// A signed, time-limited download URL for one image object.
    pub async fn image_url(&self, request: &ImageUrlRequest) -> Result<ImageUrlResponse, ApiError> {
        let object = request.validate().map_err(|e| {
            warn!("Rejected image URL request: {}", e);
            ApiError::invalid_request("Missing required fields", e)
        })?;
        let key = object.object_key();

        let signed = tokio::time::timeout(
            self.timeouts.signer,
            self.signer.signed_url(&key, SIGNED_URL_TTL),
        )
        .await;

        match signed {
            Ok(Ok(url)) => Ok(ImageUrlResponse { url }),
            Ok(Err(e)) => {
                error!("Signing URL for {} failed: {:#}", key, e);
                Err(ApiError::Internal("Failed to generate S3 URL"))
            }
            Err(_) => {
                error!(
                    "Signing URL for {} timed out after {:?}",
                    key, self.timeouts.signer
                );
                Err(ApiError::Internal("Failed to generate S3 URL"))
            }
        }
    }

    /// Record a reviewer's decision on an image, at most once per pair.
    pub async fn submit_review(
        &self,
        request: &SubmitReviewRequest,
    ) -> Result<SubmitReviewResponse, ApiError> {
        let review = request.validate().map_err(|e| {
            warn!("Rejected review submission: {}", e);
            ApiError::invalid_request("Missing required fields", e)
        })?;

        let outcome = self
            .store("insert_review", self.repository.insert_review(&review))
            .await
            .map_err(|e| {
                match e {
                    // The blocking insert keeps running after the deadline and may still commit
                    RepositoryError::Timeout { elapsed, .. } => warn!(
                        "Storing review of {} by {} timed out after {:?}; outcome unknown",
                        review.alle_ingestion_id, review.reviewer_email, elapsed
                    ),
                    e => error!(
                        "Storing review of {} by {} failed: {}",
                        review.alle_ingestion_id, review.reviewer_email, e
                    ),
                }
                ApiError::Internal("Failed to submit review")
            })?;

        match outcome {
            InsertOutcome::Inserted(result) => {
                info!(
                    "Recorded {} review of {} by {} (id {})",
                    review.review_score,
                    review.alle_ingestion_id,
                    review.reviewer_email,
                    result.insert_id
                );
                Ok(SubmitReviewResponse::submitted(result))
            }
            InsertOutcome::Duplicate => {
                warn!(
                    "Duplicate review of {} by {}",
                    review.alle_ingestion_id, review.reviewer_email
                );
                Err(ApiError::DuplicateReview)
            }
        }
    }
}
