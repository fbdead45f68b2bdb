//! Records shared between the review service and its clients.
//!
//! Reviewers and images are provisioned out-of-band; the service only reads
//! them. Reviews are created exactly once per (image, reviewer) pair and are
//! never updated or deleted.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A reviewer as returned by a successful authentication.
///
/// The stored password is a comparison credential only and never leaves the
/// server, so it has no field here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reviewer {
    pub email: String,
    /// Selects which images this reviewer sees.
    pub batch_number: i64,
}

/// An image in the catalog.
///
/// `id` is the ordering key for the review queue; `alle_ingestion_id` is the
/// stable external identifier used to join images with reviews.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Image {
    pub id: i64,
    pub alle_ingestion_id: String,
    pub alle_media_key: String,
    pub assigned_batch: i64,
}

/// A binary review decision.
///
/// Serialized as the integers `0` and `1`; any other integer is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum ReviewScore {
    Dislike,
    Like,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("review score must be 0 or 1, got {0}")]
pub struct InvalidScore(pub i64);

impl TryFrom<i64> for ReviewScore {
    type Error = InvalidScore;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Dislike),
            1 => Ok(Self::Like),
            other => Err(InvalidScore(other)),
        }
    }
}

impl From<ReviewScore> for i64 {
    fn from(score: ReviewScore) -> Self {
        match score {
            ReviewScore::Dislike => 0,
            ReviewScore::Like => 1,
        }
    }
}

impl fmt::Display for ReviewScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dislike => write!(f, "dislike"),
            Self::Like => write!(f, "like"),
        }
    }
}

/// A persisted review decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub alle_ingestion_id: String,
    pub reviewer_email: String,
    pub review_score: ReviewScore,
    pub created_at: DateTime<Utc>,
}
