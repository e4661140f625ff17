use tutor_core::model::{AssignmentId, ProgressLog, TopicId, UserId};

use super::SqliteRepository;
use super::mapping::{count_to_i64, map_progress_log_row};
use crate::repository::{ProgressLogRepository, StorageError};

fn collect_logs(rows: Vec<sqlx::sqlite::SqliteRow>) -> Result<Vec<ProgressLog>, StorageError> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(map_progress_log_row(&row)?);
    }
    Ok(out)
}

#[async_trait::async_trait]
impl ProgressLogRepository for SqliteRepository {
    async fn logs_for_student_topic(
        &self,
        student_id: &UserId,
        topic_id: &TopicId,
    ) -> Result<Vec<ProgressLog>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    pl.assignment_id, pl.date, pl.right_count, pl.wrong_count,
                    pl.empty_count, pl.bonus_count, pl.updated_at
                FROM progress_logs pl
                JOIN assignments a ON a.id = pl.assignment_id
                WHERE a.student_id = ?1 AND a.topic_id = ?2
                ORDER BY pl.date ASC, pl.assignment_id ASC
            ",
        )
        .bind(student_id.as_str())
        .bind(topic_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        collect_logs(rows)
    }

    async fn logs_for_student(&self, student_id: &UserId) -> Result<Vec<ProgressLog>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    pl.assignment_id, pl.date, pl.right_count, pl.wrong_count,
                    pl.empty_count, pl.bonus_count, pl.updated_at
                FROM progress_logs pl
                JOIN assignments a ON a.id = pl.assignment_id
                WHERE a.student_id = ?1
                ORDER BY pl.date ASC, pl.assignment_id ASC
            ",
        )
        .bind(student_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        collect_logs(rows)
    }

    async fn logs_for_assignment(
        &self,
        assignment_id: &AssignmentId,
    ) -> Result<Vec<ProgressLog>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    assignment_id, date, right_count, wrong_count,
                    empty_count, bonus_count, updated_at
                FROM progress_logs
                WHERE assignment_id = ?1
                ORDER BY date ASC
            ",
        )
        .bind(assignment_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        collect_logs(rows)
    }

    async fn upsert_log(&self, log: &ProgressLog) -> Result<(), StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let exists = sqlx::query("SELECT 1 FROM assignments WHERE id = ?1")
            .bind(log.assignment_id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if exists.is_none() {
            return Err(StorageError::NotFound);
        }

        sqlx::query(
            r"
            INSERT INTO progress_logs (
                assignment_id, date, right_count, wrong_count,
                empty_count, bonus_count, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(assignment_id, date) DO UPDATE SET
                right_count = excluded.right_count,
                wrong_count = excluded.wrong_count,
                empty_count = excluded.empty_count,
                bonus_count = excluded.bonus_count,
                updated_at = excluded.updated_at
            ",
        )
        .bind(log.assignment_id.as_str())
        .bind(log.date)
        .bind(count_to_i64("right_count", log.counts.right)?)
        .bind(count_to_i64("wrong_count", log.counts.wrong)?)
        .bind(count_to_i64("empty_count", log.counts.empty)?)
        .bind(count_to_i64("bonus_count", log.counts.bonus)?)
        .bind(log.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }
}
