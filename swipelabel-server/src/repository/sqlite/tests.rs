//! Tests for SQLite repository implementation.

use std::collections::HashSet;
use std::sync::Arc;

use rusqlite::params;
use swipelabel_core::{Credentials, Image, NewReview, ReviewScore};

use super::super::{CatalogImport, InsertOutcome, ReviewRepository, ReviewerAccount};
use super::{SqliteRepository, CURRENT_SCHEMA_VERSION};

use proptest::prelude::*;

fn image(id: i64, batch: i64) -> Image {
    Image {
        id,
        alle_ingestion_id: format!("ing-{}", id),
        alle_media_key: format!("media/{}.jpg", id),
        assigned_batch: batch,
    }
}

fn account(email: &str, password: &str, batch_number: i64) -> ReviewerAccount {
    ReviewerAccount {
        email: email.to_string(),
        password: password.to_string(),
        batch_number,
    }
}

fn review(id: i64, email: &str, score: ReviewScore) -> NewReview {
    NewReview {
        alle_ingestion_id: format!("ing-{}", id),
        review_score: score,
        reviewer_email: email.to_string(),
    }
}

fn credentials(email: &str, password: &str) -> Credentials {
    Credentials {
        email: email.to_string(),
        password: password.to_string(),
    }
}

async fn seeded_repo() -> SqliteRepository {
    let repo = SqliteRepository::new_in_memory().unwrap();
    repo.import_catalog(&CatalogImport {
        reviewers: vec![account("a@x.com", "pw1", 5), account("b@x.com", "pw2", 6)],
        images: vec![image(3, 5), image(1, 5), image(2, 5), image(10, 6)],
    })
    .await
    .unwrap();
    repo
}

fn ids(images: &[Image]) -> Vec<i64> {
    images.iter().map(|i| i.id).collect()
}

#[tokio::test]
async fn test_find_reviewer_matches_email_and_password() {
    let repo = seeded_repo().await;

    let reviewer = repo
        .find_reviewer(&credentials("a@x.com", "pw1"))
        .await
        .unwrap()
        .expect("reviewer should match");
    assert_eq!(reviewer.email, "a@x.com");
    assert_eq!(reviewer.batch_number, 5);

    assert!(repo
        .find_reviewer(&credentials("a@x.com", "pw2"))
        .await
        .unwrap()
        .is_none());
    assert!(repo
        .find_reviewer(&credentials("nobody@x.com", "pw1"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_batch_number_for_unknown_email_is_none() {
    let repo = seeded_repo().await;
    assert_eq!(repo.batch_number("b@x.com").await.unwrap(), Some(6));
    assert_eq!(repo.batch_number("nobody@x.com").await.unwrap(), None);
}

#[tokio::test]
async fn test_unreviewed_images_ordered_by_id() {
    let repo = seeded_repo().await;
    let images = repo.unreviewed_images("a@x.com", 5, 300).await.unwrap();
    assert_eq!(ids(&images), vec![1, 2, 3]);
    assert_eq!(images[0].alle_media_key, "media/1.jpg");
}

#[tokio::test]
async fn test_unreviewed_images_shrink_as_reviews_land() {
    let repo = seeded_repo().await;

    repo.insert_review(&review(1, "a@x.com", ReviewScore::Like))
        .await
        .unwrap();
    let after_one = repo.unreviewed_images("a@x.com", 5, 300).await.unwrap();
    assert_eq!(ids(&after_one), vec![2, 3]);

    repo.insert_review(&review(3, "a@x.com", ReviewScore::Dislike))
        .await
        .unwrap();
    let after_two = repo.unreviewed_images("a@x.com", 5, 300).await.unwrap();
    assert_eq!(ids(&after_two), vec![2]);
}

#[tokio::test]
async fn test_other_reviewers_reviews_do_not_hide_images() {
    let repo = seeded_repo().await;
    repo.insert_review(&review(1, "b@x.com", ReviewScore::Like))
        .await
        .unwrap();

    let images = repo.unreviewed_images("a@x.com", 5, 300).await.unwrap();
    assert_eq!(ids(&images), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_unreviewed_images_limit() {
    let repo = seeded_repo().await;
    let images = repo.unreviewed_images("a@x.com", 5, 2).await.unwrap();
    assert_eq!(ids(&images), vec![1, 2]);
}

#[tokio::test]
async fn test_duplicate_insert_is_reported_not_stored() {
    let repo = seeded_repo().await;

    let first = repo
        .insert_review(&review(2, "a@x.com", ReviewScore::Dislike))
        .await
        .unwrap();
    let InsertOutcome::Inserted(result) = first else {
        panic!("first insert should succeed, got {:?}", first);
    };
    assert_eq!(result.affected_rows, 1);
    assert!(result.insert_id > 0);

    let second = repo
        .insert_review(&review(2, "a@x.com", ReviewScore::Like))
        .await
        .unwrap();
    assert_eq!(second, InsertOutcome::Duplicate);

    let conn = repo.conn.lock().unwrap();
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM alle_prog_image_reviews WHERE alle_ingestion_id = ?1",
            params!["ing-2"],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_concurrent_inserts_for_same_pair_only_one_wins() {
    let repo = Arc::new(seeded_repo().await);

    let mut handles = Vec::new();
    for i in 0..8 {
        let repo = repo.clone();
        let score = if i % 2 == 0 {
            ReviewScore::Like
        } else {
            ReviewScore::Dislike
        };
        handles.push(tokio::spawn(async move {
            repo.insert_review(&review(3, "a@x.com", score)).await
        }));
    }

    let mut inserted = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            InsertOutcome::Inserted(_) => inserted += 1,
            InsertOutcome::Duplicate => duplicates += 1,
        }
    }

    assert_eq!(inserted, 1);
    assert_eq!(duplicates, 7);
}

#[tokio::test]
async fn test_reviews_by_reviewer_roundtrip() {
    let repo = seeded_repo().await;
    repo.insert_review(&review(3, "a@x.com", ReviewScore::Like))
        .await
        .unwrap();
    repo.insert_review(&review(1, "a@x.com", ReviewScore::Dislike))
        .await
        .unwrap();

    let reviews = repo.reviews_by_reviewer("a@x.com").await.unwrap();
    assert_eq!(reviews.len(), 2);
    assert_eq!(reviews[0].alle_ingestion_id, "ing-3");
    assert_eq!(reviews[0].review_score, ReviewScore::Like);
    assert_eq!(reviews[1].review_score, ReviewScore::Dislike);
    assert!(reviews[0].created_at <= reviews[1].created_at);
}

#[tokio::test]
async fn test_import_replaces_existing_rows() {
    let repo = seeded_repo().await;
    repo.import_catalog(&CatalogImport {
        reviewers: vec![account("a@x.com", "new-pw", 6)],
        images: vec![image(1, 6)],
    })
    .await
    .unwrap();

    assert!(repo
        .find_reviewer(&credentials("a@x.com", "pw1"))
        .await
        .unwrap()
        .is_none());
    assert_eq!(repo.batch_number("a@x.com").await.unwrap(), Some(6));

    let batch_six = repo.unreviewed_images("a@x.com", 6, 300).await.unwrap();
    assert_eq!(ids(&batch_six), vec![1, 10]);
}

#[test]
fn test_schema_version_is_set() {
    let repo = SqliteRepository::new_in_memory().unwrap();
    let conn = repo.conn.lock().unwrap();
    let version: i64 = conn
        .query_row("SELECT version FROM schema_version WHERE id = 1", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(version, CURRENT_SCHEMA_VERSION);
}

#[test]
fn test_rejects_newer_schema_version() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("reviews.db");

    {
        let repo = SqliteRepository::new(&db_path).unwrap();
        let conn = repo.conn.lock().unwrap();
        conn.execute(
            "UPDATE schema_version SET version = ?1 WHERE id = 1",
            params![CURRENT_SCHEMA_VERSION + 1],
        )
        .unwrap();
    }

    match SqliteRepository::new(&db_path) {
        Ok(_) => panic!("should reject newer schema version"),
        Err(e) => assert!(e.to_string().contains("newer than supported")),
    }
}

#[tokio::test]
async fn test_reopen_keeps_reviews() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("reviews.db");

    {
        let repo = SqliteRepository::new(&db_path).unwrap();
        repo.import_catalog(&CatalogImport {
            reviewers: vec![account("a@x.com", "pw1", 5)],
            images: vec![image(1, 5), image(2, 5)],
        })
        .await
        .unwrap();
        repo.insert_review(&review(1, "a@x.com", ReviewScore::Like))
            .await
            .unwrap();
    }

    let repo = SqliteRepository::new(&db_path).unwrap();
    let images = repo.unreviewed_images("a@x.com", 5, 300).await.unwrap();
    assert_eq!(ids(&images), vec![2]);
}

proptest! {
    /// Property: the unreviewed queue never contains an image the reviewer has
    /// reviewed, is strictly ascending by id, and contains every other image of
    /// the batch up to the limit.
    #[test]
    fn unreviewed_queue_excludes_reviewed_images(
        batches in proptest::collection::vec(0i64..3, 1..40),
        reviewed_mask in proptest::collection::vec(any::<bool>(), 40),
        limit in 1usize..50,
    ) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let repo = SqliteRepository::new_in_memory().unwrap();
            let images: Vec<Image> = batches
                .iter()
                .enumerate()
                .map(|(i, batch)| image(i as i64 + 1, *batch))
                .collect();
            repo.import_catalog(&CatalogImport {
                reviewers: vec![account("a@x.com", "pw1", 1)],
                images: images.clone(),
            })
            .await
            .unwrap();

            let mut reviewed = HashSet::new();
            for image in &images {
                if reviewed_mask[(image.id - 1) as usize] {
                    repo.insert_review(&review(image.id, "a@x.com", ReviewScore::Like))
                        .await
                        .unwrap();
                    reviewed.insert(image.id);
                }
            }

            let queue = repo.unreviewed_images("a@x.com", 1, limit).await.unwrap();

            for image in &queue {
                assert_eq!(image.assigned_batch, 1);
                assert!(!reviewed.contains(&image.id), "reviewed image {} returned", image.id);
            }
            assert!(queue.windows(2).all(|w| w[0].id < w[1].id));

            let expected: Vec<i64> = images
                .iter()
                .filter(|i| i.assigned_batch == 1 && !reviewed.contains(&i.id))
                .map(|i| i.id)
                .take(limit)
                .collect();
            assert_eq!(ids(&queue), expected);
        });
    }
}
