//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use tutor_core::model::{AssignmentId, LessonId, TopicId, UserId};

/// Errors emitted by `ProgressService`.
///
/// Ids are validated when they are parsed (`IdError`), before any call here.
/// Alerting failures never show up as a `ProgressError`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("student {0} not found")]
    StudentNotFound(UserId),

    #[error("topic {0} not found")]
    TopicNotFound(TopicId),

    #[error("lesson {0} not found")]
    LessonNotFound(LessonId),

    #[error("assignment {0} not found")]
    AssignmentNotFound(AssignmentId),

    #[error("student {student} does not belong to teacher {teacher}")]
    StudentTenantMismatch { student: UserId, teacher: UserId },

    #[error("lesson {lesson} is not visible to teacher {teacher}")]
    LessonTenantMismatch { lesson: LessonId, teacher: UserId },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `SubmissionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubmissionError {
    #[error("assignment {0} not found")]
    AssignmentNotFound(AssignmentId),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors reported by alert and preference backends.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AlertError {
    #[error("alert backend failed: {0}")]
    Backend(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
