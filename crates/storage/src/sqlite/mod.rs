//! `SQLite` adapter over the host application's tables.
//!
//! The schema is owned and migrated by the host application; this adapter only
//! reads it (and upserts progress rows). Expected tables:
//!
//! - `users (id TEXT PRIMARY KEY, role TEXT, teacher_id TEXT NULL)`
//! - `lessons (id TEXT PRIMARY KEY, name TEXT, teacher_id TEXT NULL)`
//! - `topics (id TEXT PRIMARY KEY, lesson_id TEXT, name TEXT)`
//! - `assignments (id TEXT PRIMARY KEY, student_id TEXT, topic_id TEXT,
//!   question_count INTEGER, daily_target INTEGER, start_date TEXT, end_date TEXT)`
//! - `progress_logs (assignment_id TEXT, date TEXT, right_count INTEGER,
//!   wrong_count INTEGER, empty_count INTEGER, bonus_count INTEGER,
//!   updated_at TEXT, UNIQUE (assignment_id, date))`

use std::sync::Arc;
use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{
    AssignmentRepository, CurriculumRepository, ProgressLogRepository, Storage, UserRepository,
};

mod assignment_repo;
mod curriculum_repo;
mod mapping;
mod progress_log_repo;
mod user_repo;

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Connect to `SQLite` using the given URL.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established or if
    /// enforcing foreign key constraints fails during setup.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl Storage {
    /// Build a `Storage` backed by `SQLite`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        let users: Arc<dyn UserRepository> = Arc::new(repo.clone());
        let curriculum: Arc<dyn CurriculumRepository> = Arc::new(repo.clone());
        let assignments: Arc<dyn AssignmentRepository> = Arc::new(repo.clone());
        let progress_logs: Arc<dyn ProgressLogRepository> = Arc::new(repo);
        Ok(Self {
            users,
            curriculum,
            assignments,
            progress_logs,
        })
    }
}
