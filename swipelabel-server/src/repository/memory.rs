//! In-memory implementation of `ReviewRepository`.
//!
//! All tables live behind a single `RwLock`, so the uniqueness check and the
//! insert of a review happen under one write guard. State is lost on restart.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use swipelabel_core::{Credentials, Image, InsertResult, NewReview, Review, Reviewer};
use tokio::sync::RwLock;

use super::{CatalogImport, InsertOutcome, RepositoryError, ReviewRepository, ReviewerAccount};

#[derive(Default)]
struct Tables {
    reviewers: HashMap<String, ReviewerAccount>,
    /// Keyed by id so iteration yields ascending id order.
    images: BTreeMap<i64, Image>,
    /// Keyed by (ingestion id, reviewer email); value is (row id, review).
    reviews: HashMap<(String, String), (i64, Review)>,
    next_review_id: i64,
}

/// In-memory review repository.
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables {
                next_review_id: 1,
                ..Tables::default()
            }),
        }
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReviewRepository for InMemoryRepository {
    async fn find_reviewer(
        &self,
        credentials: &Credentials,
    ) -> Result<Option<Reviewer>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .reviewers
            .get(&credentials.email)
            .filter(|account| account.password == credentials.password)
            .map(|account| Reviewer {
                email: account.email.clone(),
                batch_number: account.batch_number,
            }))
    }

    async fn batch_number(&self, email: &str) -> Result<Option<i64>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .reviewers
            .get(email)
            .map(|account| account.batch_number))
    }

    async fn unreviewed_images(
        &self,
        email: &str,
        batch_number: i64,
        limit: usize,
    ) -> Result<Vec<Image>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .images
            .values()
            .filter(|image| image.assigned_batch == batch_number)
            .filter(|image| {
                !tables
                    .reviews
                    .contains_key(&(image.alle_ingestion_id.clone(), email.to_string()))
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn insert_review(&self, review: &NewReview) -> Result<InsertOutcome, RepositoryError> {
        let mut tables = self.tables.write().await;
        let key = (
            review.alle_ingestion_id.clone(),
            review.reviewer_email.clone(),
        );
        if tables.reviews.contains_key(&key) {
            return Ok(InsertOutcome::Duplicate);
        }

        let id = tables.next_review_id;
        tables.next_review_id += 1;
        tables.reviews.insert(
            key,
            (
                id,
                Review {
                    alle_ingestion_id: review.alle_ingestion_id.clone(),
                    reviewer_email: review.reviewer_email.clone(),
                    review_score: review.review_score,
                    created_at: Utc::now(),
                },
            ),
        );

        Ok(InsertOutcome::Inserted(InsertResult {
            insert_id: id,
            affected_rows: 1,
        }))
    }

    async fn reviews_by_reviewer(&self, email: &str) -> Result<Vec<Review>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&(i64, Review)> = tables
            .reviews
            .values()
            .filter(|(_, review)| review.reviewer_email == email)
            .collect();
        rows.sort_by_key(|(id, _)| *id);
        Ok(rows.into_iter().map(|(_, review)| review.clone()).collect())
    }

    async fn import_catalog(&self, catalog: &CatalogImport) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        for account in &catalog.reviewers {
            tables
                .reviewers
                .insert(account.email.clone(), account.clone());
        }
        for image in &catalog.images {
            tables.images.insert(image.id, image.clone());
        }
        Ok(())
    }
}
