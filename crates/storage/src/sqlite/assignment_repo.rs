use tutor_core::model::{Assignment, AssignmentId, UserId};

use super::SqliteRepository;
use super::mapping::map_assignment_row;
use crate::repository::{AssignmentRepository, StorageError};

#[async_trait::async_trait]
impl AssignmentRepository for SqliteRepository {
    async fn get_assignment(&self, id: &AssignmentId) -> Result<Option<Assignment>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, student_id, topic_id, question_count, daily_target, start_date, end_date
            FROM assignments WHERE id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_assignment_row).transpose()
    }

    async fn assignments_for_student(
        &self,
        student_id: &UserId,
    ) -> Result<Vec<Assignment>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, student_id, topic_id, question_count, daily_target, start_date, end_date
            FROM assignments
            WHERE student_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(student_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_assignment_row(&row)?);
        }
        Ok(out)
    }
}
