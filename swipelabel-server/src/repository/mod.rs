//! Repository abstraction over the reviewer, image and review tables.
//!
//! The controller only talks to `ReviewRepository`; implementations provide
//! the actual backend (in-memory or SQLite). Every method is a single
//! independent exchange with the store: nothing is held between calls.

mod catalog;
mod memory;
mod sqlite;

pub use catalog::{CatalogImport, ReviewerAccount};
pub use memory::InMemoryRepository;
pub use sqlite::SqliteRepository;

use std::time::Duration;

use async_trait::async_trait;
use swipelabel_core::{Credentials, Image, InsertResult, NewReview, Review, Reviewer};
use thiserror::Error;

/// Errors surfaced by repository implementations.
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    #[error("storage error during {operation}: {message}")]
    Storage {
        operation: &'static str,
        message: String,
    },

    #[error("corrupt {what} in store")]
    Corruption { what: &'static str },

    #[error("{operation} timed out after {elapsed:?}")]
    Timeout {
        operation: &'static str,
        elapsed: Duration,
    },
}

impl RepositoryError {
    pub fn storage(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Storage {
            operation,
            message: message.into(),
        }
    }

    pub fn corruption(what: &'static str) -> Self {
        Self::Corruption { what }
    }
}

/// Outcome of an attempt to record a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(InsertResult),
    /// A review for this (image, reviewer) pair already exists.
    Duplicate,
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Find the reviewer whose email and password both match exactly.
    async fn find_reviewer(
        &self,
        credentials: &Credentials,
    ) -> Result<Option<Reviewer>, RepositoryError>;

    /// Batch assigned to a reviewer, or `None` for an unknown email.
    async fn batch_number(&self, email: &str) -> Result<Option<i64>, RepositoryError>;

    /// Images of `batch_number` not yet reviewed by `email`, ascending by id,
    /// at most `limit` of them.
    async fn unreviewed_images(
        &self,
        email: &str,
        batch_number: i64,
        limit: usize,
    ) -> Result<Vec<Image>, RepositoryError>;

    /// Record a review in one atomic attempt.
    ///
    /// Uniqueness of (ingestion id, reviewer email) is enforced by the store;
    /// a conflicting insert reports `InsertOutcome::Duplicate`.
    async fn insert_review(&self, review: &NewReview) -> Result<InsertOutcome, RepositoryError>;

    /// All reviews recorded by a reviewer, oldest first.
    async fn reviews_by_reviewer(&self, email: &str) -> Result<Vec<Review>, RepositoryError>;

    /// Provision reviewers and images out-of-band.
    ///
    /// Reviewers are keyed by email and images by id; existing rows are replaced.
    async fn import_catalog(&self, catalog: &CatalogImport) -> Result<(), RepositoryError>;
}
