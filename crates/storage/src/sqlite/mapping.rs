use chrono::{DateTime, NaiveDate, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tutor_core::model::{
    AnswerCounts, Assignment, AssignmentId, Lesson, LessonId, ProgressLog, Role, Topic, TopicId,
    User, UserId,
};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} out of range: {v}")))
}

pub(crate) fn count_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn id_column<T, F>(row: &SqliteRow, column: &'static str, parse: F) -> Result<T, StorageError>
where
    F: Fn(&str) -> Result<T, tutor_core::model::IdError>,
{
    let raw: String = row.try_get(column).map_err(ser)?;
    parse(&raw).map_err(ser)
}

fn optional_user_id(row: &SqliteRow, column: &'static str) -> Result<Option<UserId>, StorageError> {
    row.try_get::<Option<String>, _>(column)
        .map_err(ser)?
        .map(|raw| UserId::parse(&raw).map_err(ser))
        .transpose()
}

pub(crate) fn map_user_row(row: &SqliteRow) -> Result<User, StorageError> {
    let role: String = row.try_get("role").map_err(ser)?;
    Ok(User::new(
        id_column(row, "id", UserId::parse)?,
        Role::parse(&role).map_err(ser)?,
        optional_user_id(row, "teacher_id")?,
    ))
}

pub(crate) fn map_lesson_row(row: &SqliteRow) -> Result<Lesson, StorageError> {
    Lesson::new(
        id_column(row, "id", LessonId::parse)?,
        row.try_get::<String, _>("name").map_err(ser)?,
        optional_user_id(row, "teacher_id")?,
    )
    .map_err(ser)
}

pub(crate) fn map_topic_row(row: &SqliteRow) -> Result<Topic, StorageError> {
    Topic::new(
        id_column(row, "id", TopicId::parse)?,
        id_column(row, "lesson_id", LessonId::parse)?,
        row.try_get::<String, _>("name").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_assignment_row(row: &SqliteRow) -> Result<Assignment, StorageError> {
    let start_date: NaiveDate = row.try_get("start_date").map_err(ser)?;
    let end_date: NaiveDate = row.try_get("end_date").map_err(ser)?;
    Assignment::new(
        id_column(row, "id", AssignmentId::parse)?,
        id_column(row, "student_id", UserId::parse)?,
        id_column(row, "topic_id", TopicId::parse)?,
        i64_to_u32(
            "question_count",
            row.try_get::<i64, _>("question_count").map_err(ser)?,
        )?,
        i64_to_u32(
            "daily_target",
            row.try_get::<i64, _>("daily_target").map_err(ser)?,
        )?,
        start_date,
        end_date,
    )
    .map_err(ser)
}

pub(crate) fn map_progress_log_row(row: &SqliteRow) -> Result<ProgressLog, StorageError> {
    let count = |column: &'static str| -> Result<u64, StorageError> {
        i64_to_u64(column, row.try_get::<i64, _>(column).map_err(ser)?)
    };
    let counts = AnswerCounts::new(
        count("right_count")?,
        count("wrong_count")?,
        count("empty_count")?,
        count("bonus_count")?,
    );
    let date: NaiveDate = row.try_get("date").map_err(ser)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(ser)?;

    Ok(ProgressLog::new(
        id_column(row, "assignment_id", AssignmentId::parse)?,
        date,
        counts,
        updated_at,
    ))
}
