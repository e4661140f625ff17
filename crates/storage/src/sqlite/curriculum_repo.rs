use tutor_core::model::{Lesson, LessonId, Topic, TopicId};

use super::SqliteRepository;
use super::mapping::{map_lesson_row, map_topic_row};
use crate::repository::{CurriculumRepository, StorageError};

#[async_trait::async_trait]
impl CurriculumRepository for SqliteRepository {
    async fn get_lesson(&self, id: &LessonId) -> Result<Option<Lesson>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, name, teacher_id
            FROM lessons WHERE id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_lesson_row).transpose()
    }

    async fn get_topic(&self, id: &TopicId) -> Result<Option<Topic>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, lesson_id, name
            FROM topics WHERE id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_topic_row).transpose()
    }

    async fn topics_for_lesson(&self, lesson_id: &LessonId) -> Result<Vec<Topic>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, lesson_id, name
            FROM topics
            WHERE lesson_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(lesson_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut topics = Vec::with_capacity(rows.len());
        for row in rows {
            topics.push(map_topic_row(&row)?);
        }
        Ok(topics)
    }
}
