//! SQLite implementation of `ReviewRepository`.
//!
//! # Schema Versioning
//!
//! The database has a `schema_version` table that tracks the schema version.
//! When the schema needs to change, increment `CURRENT_SCHEMA_VERSION` and add
//! a migration in `run_migrations()`. Migrations run sequentially from the
//! current version to the target version.
//!
//! # Review uniqueness
//!
//! `alle_prog_image_reviews` carries `UNIQUE (alle_ingestion_id, reviewer_email)`.
//! Inserts use `ON CONFLICT DO NOTHING`, so two concurrent submissions for the
//! same pair cannot both succeed; the loser sees zero changed rows.

#[cfg(test)]
mod tests;

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use swipelabel_core::{Credentials, Image, InsertResult, NewReview, Review, ReviewScore, Reviewer};
use tracing::warn;

use super::{CatalogImport, InsertOutcome, RepositoryError, ReviewRepository};

/// Current schema version. Increment this when making schema changes and add
/// corresponding migration logic in `run_migrations()`.
const CURRENT_SCHEMA_VERSION: i64 = 1;

/// SQLite-backed review repository.
///
/// Uses `tokio::task::spawn_blocking` to run synchronous rusqlite operations
/// without blocking the async runtime. Each call holds the connection lock only
/// for its own statements and runs no transaction that outlives the call.
pub struct SqliteRepository {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl SqliteRepository {
    /// Open (or create) the database at `path` and bring its schema up to date.
    ///
    /// # Durability
    ///
    /// The database is configured with:
    /// - `journal_mode = WAL` for better concurrency and crash safety
    /// - `synchronous = FULL` so acknowledged reviews survive power loss
    /// - `busy_timeout = 5000ms` to handle concurrent access gracefully
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_string_lossy();
        let is_in_memory = path_str == ":memory:";

        if !is_in_memory && !path_str.is_empty() {
            if let Some(parent) = path_ref.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        RepositoryError::storage(
                            "create database directory",
                            format!("{}: {}", parent.display(), e),
                        )
                    })?;
                }
            }
        }

        let conn = Connection::open(path_ref)
            .map_err(|e| RepositoryError::storage("open database", e.to_string()))?;

        // The credential table holds cleartext passwords
        #[cfg(unix)]
        if !is_in_memory && !path_str.is_empty() {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            if let Err(e) = std::fs::set_permissions(path_ref, permissions) {
                warn!(
                    "Failed to set restrictive permissions on database file: {}",
                    e
                );
            }
        }

        // In-memory databases report "memory" as their journal mode.
        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(|e| RepositoryError::storage("set journal_mode", e.to_string()))?;

        let journal_mode_ok = journal_mode.eq_ignore_ascii_case("wal")
            || (is_in_memory && journal_mode.eq_ignore_ascii_case("memory"));

        if !journal_mode_ok {
            return Err(RepositoryError::storage(
                "configure journal_mode",
                format!(
                    "Failed to enable WAL mode: SQLite returned '{}' instead of 'wal'",
                    journal_mode
                ),
            ));
        }

        conn.execute_batch(
            r#"
            PRAGMA synchronous = FULL;
            PRAGMA busy_timeout = 5000;
            "#,
        )
        .map_err(|e| RepositoryError::storage("configure pragmas", e.to_string()))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                version INTEGER NOT NULL
            );
            "#,
        )
        .map_err(|e| RepositoryError::storage("create schema_version table", e.to_string()))?;

        let current_version: i64 = conn
            .query_row(
                "SELECT version FROM schema_version WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| RepositoryError::storage("get schema version", e.to_string()))?
            .unwrap_or(0);

        Self::run_migrations(&conn, current_version)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create a new in-memory SQLite repository (for testing).
    pub fn new_in_memory() -> Result<Self, RepositoryError> {
        Self::new(":memory:")
    }

    /// Run migrations from `from_version` to `CURRENT_SCHEMA_VERSION`.
    fn run_migrations(conn: &Connection, from_version: i64) -> Result<(), RepositoryError> {
        if from_version > CURRENT_SCHEMA_VERSION {
            return Err(RepositoryError::storage(
                "schema version",
                format!(
                    "Database schema version {} is newer than supported version {}. \
                     Please upgrade the application.",
                    from_version, CURRENT_SCHEMA_VERSION
                ),
            ));
        }

        if from_version == CURRENT_SCHEMA_VERSION {
            return Ok(());
        }

        if from_version < 1 {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS user_identities (
                    email TEXT PRIMARY KEY,
                    password TEXT NOT NULL,
                    batch_number INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS alle_prog_images (
                    id INTEGER PRIMARY KEY,
                    alle_ingestion_id TEXT NOT NULL,
                    alle_media_key TEXT NOT NULL,
                    assigned_batch INTEGER NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_images_batch
                    ON alle_prog_images(assigned_batch, id);

                CREATE TABLE IF NOT EXISTS alle_prog_image_reviews (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    alle_ingestion_id TEXT NOT NULL,
                    review_score INTEGER NOT NULL CHECK (review_score IN (0, 1)),
                    reviewer_email TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    UNIQUE (alle_ingestion_id, reviewer_email)
                );

                CREATE INDEX IF NOT EXISTS idx_reviews_reviewer
                    ON alle_prog_image_reviews(reviewer_email);
                "#,
            )
            .map_err(|e| RepositoryError::storage("migration v1", e.to_string()))?;
        }

        conn.execute(
            "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?1)",
            params![CURRENT_SCHEMA_VERSION],
        )
        .map_err(|e| RepositoryError::storage("update schema version", e.to_string()))?;

        Ok(())
    }

    /// Run `f` against the connection on the blocking pool.
    ///
    /// The lock is released when `f` returns, on success and error alike.
    async fn with_conn<T, F>(&self, operation: &'static str, f: F) -> Result<T, RepositoryError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| RepositoryError::storage(operation, "connection mutex poisoned"))?;
            f(&*conn).map_err(|e| RepositoryError::storage(operation, e.to_string()))
        })
        .await
        .map_err(|e| RepositoryError::storage(operation, e.to_string()))?
    }
}

/// Convert a usize limit to i64 for the SQLite LIMIT clause.
fn usize_to_i64_limit(limit: usize, operation: &'static str) -> Result<i64, RepositoryError> {
    i64::try_from(limit).map_err(|_| {
        RepositoryError::storage(
            operation,
            format!(
                "limit {} exceeds maximum storable value ({})",
                limit,
                i64::MAX
            ),
        )
    })
}

#[async_trait]
impl ReviewRepository for SqliteRepository {
    async fn find_reviewer(
        &self,
        credentials: &Credentials,
    ) -> Result<Option<Reviewer>, RepositoryError> {
        let email = credentials.email.clone();
        let password = credentials.password.clone();

        self.with_conn("find_reviewer", move |conn| {
            conn.query_row(
                "SELECT email, batch_number FROM user_identities
                 WHERE email = ?1 AND password = ?2",
                params![email, password],
                |row| {
                    Ok(Reviewer {
                        email: row.get(0)?,
                        batch_number: row.get(1)?,
                    })
                },
            )
            .optional()
        })
        .await
    }

    async fn batch_number(&self, email: &str) -> Result<Option<i64>, RepositoryError> {
        let email = email.to_string();

        self.with_conn("batch_number", move |conn| {
            conn.query_row(
                "SELECT batch_number FROM user_identities WHERE email = ?1",
                params![email],
                |row| row.get(0),
            )
            .optional()
        })
        .await
    }

    async fn unreviewed_images(
        &self,
        email: &str,
        batch_number: i64,
        limit: usize,
    ) -> Result<Vec<Image>, RepositoryError> {
        let email = email.to_string();
        let limit = usize_to_i64_limit(limit, "unreviewed_images")?;

        self.with_conn("unreviewed_images", move |conn| {
            let mut stmt = conn.prepare(
                "SELECT i.id, i.alle_ingestion_id, i.alle_media_key, i.assigned_batch
                 FROM alle_prog_images i
                 LEFT JOIN alle_prog_image_reviews r
                   ON r.alle_ingestion_id = i.alle_ingestion_id
                  AND r.reviewer_email = ?1
                 WHERE i.assigned_batch = ?2
                   AND r.id IS NULL
                 ORDER BY i.id ASC
                 LIMIT ?3",
            )?;
            let rows = stmt.query_map(params![email, batch_number, limit], |row| {
                Ok(Image {
                    id: row.get(0)?,
                    alle_ingestion_id: row.get(1)?,
                    alle_media_key: row.get(2)?,
                    assigned_batch: row.get(3)?,
                })
            })?;
            rows.collect()
        })
        .await
    }

    async fn insert_review(&self, review: &NewReview) -> Result<InsertOutcome, RepositoryError> {
        let ingestion_id = review.alle_ingestion_id.clone();
        let score = i64::from(review.review_score);
        let reviewer_email = review.reviewer_email.clone();
        let created_at = Utc::now().to_rfc3339();

        self.with_conn("insert_review", move |conn| {
            let changed = conn.execute(
                "INSERT INTO alle_prog_image_reviews
                     (alle_ingestion_id, review_score, reviewer_email, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (alle_ingestion_id, reviewer_email) DO NOTHING",
                params![ingestion_id, score, reviewer_email, created_at],
            )?;

            if changed == 0 {
                return Ok(InsertOutcome::Duplicate);
            }

            Ok(InsertOutcome::Inserted(InsertResult {
                insert_id: conn.last_insert_rowid(),
                affected_rows: changed as u64,
            }))
        })
        .await
    }

    async fn reviews_by_reviewer(&self, email: &str) -> Result<Vec<Review>, RepositoryError> {
        let email = email.to_string();

        let rows: Vec<(String, i64, String, String)> = self
            .with_conn("reviews_by_reviewer", move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT alle_ingestion_id, review_score, reviewer_email, created_at
                     FROM alle_prog_image_reviews
                     WHERE reviewer_email = ?1
                     ORDER BY id ASC",
                )?;
                let rows = stmt.query_map(params![email], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                })?;
                rows.collect()
            })
            .await?;

        rows.into_iter()
            .map(|(alle_ingestion_id, score, reviewer_email, created_at)| {
                let review_score = ReviewScore::try_from(score)
                    .map_err(|_| RepositoryError::corruption("review score"))?;
                let created_at = DateTime::parse_from_rfc3339(&created_at)
                    .map_err(|_| RepositoryError::corruption("review timestamp"))?
                    .with_timezone(&Utc);
                Ok(Review {
                    alle_ingestion_id,
                    reviewer_email,
                    review_score,
                    created_at,
                })
            })
            .collect()
    }

    async fn import_catalog(&self, catalog: &CatalogImport) -> Result<(), RepositoryError> {
        let catalog = catalog.clone();

        self.with_conn("import_catalog", move |conn| {
            let tx = conn.unchecked_transaction()?;
            for account in &catalog.reviewers {
                tx.execute(
                    "INSERT INTO user_identities (email, password, batch_number)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT (email) DO UPDATE SET
                         password = excluded.password,
                         batch_number = excluded.batch_number",
                    params![account.email, account.password, account.batch_number],
                )?;
            }
            for image in &catalog.images {
                tx.execute(
                    "INSERT INTO alle_prog_images (id, alle_ingestion_id, alle_media_key, assigned_batch)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT (id) DO UPDATE SET
                         alle_ingestion_id = excluded.alle_ingestion_id,
                         alle_media_key = excluded.alle_media_key,
                         assigned_batch = excluded.assigned_batch",
                    params![
                        image.id,
                        image.alle_ingestion_id,
                        image.alle_media_key,
                        image.assigned_batch
                    ],
                )?;
            }
            tx.commit()
        })
        .await
    }
}
