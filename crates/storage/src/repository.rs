use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tutor_core::model::{
    Assignment, AssignmentId, Lesson, LessonId, ProgressLog, Topic, TopicId, User, UserId,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Read access to user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fetch a user by ID.
    ///
    /// Returns `Ok(None)` when the user does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails.
    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StorageError>;
}

/// Read access to lessons and their topics.
#[async_trait]
pub trait CurriculumRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails.
    async fn get_lesson(&self, id: &LessonId) -> Result<Option<Lesson>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails.
    async fn get_topic(&self, id: &TopicId) -> Result<Option<Topic>, StorageError>;

    /// All topics of a lesson, ordered by ID. Empty if the lesson has none.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails.
    async fn topics_for_lesson(&self, lesson_id: &LessonId) -> Result<Vec<Topic>, StorageError>;
}

/// Read access to assignments.
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails.
    async fn get_assignment(&self, id: &AssignmentId) -> Result<Option<Assignment>, StorageError>;

    /// Every assignment of a student, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails.
    async fn assignments_for_student(
        &self,
        student_id: &UserId,
    ) -> Result<Vec<Assignment>, StorageError>;
}

/// Progress rows, joined through their assignment where needed.
#[async_trait]
pub trait ProgressLogRepository: Send + Sync {
    /// Logs of every assignment the student has on `topic_id`, ordered by date.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails.
    async fn logs_for_student_topic(
        &self,
        student_id: &UserId,
        topic_id: &TopicId,
    ) -> Result<Vec<ProgressLog>, StorageError>;

    /// Logs of every assignment of the student, ordered by date.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails.
    async fn logs_for_student(&self, student_id: &UserId) -> Result<Vec<ProgressLog>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails.
    async fn logs_for_assignment(
        &self,
        assignment_id: &AssignmentId,
    ) -> Result<Vec<ProgressLog>, StorageError>;

    /// Insert the day's row, or replace its counts if one exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the assignment is unknown, or other
    /// storage errors.
    async fn upsert_log(&self, log: &ProgressLog) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    users: Arc<Mutex<HashMap<UserId, User>>>,
    lessons: Arc<Mutex<HashMap<LessonId, Lesson>>>,
    topics: Arc<Mutex<HashMap<TopicId, Topic>>>,
    assignments: Arc<Mutex<HashMap<AssignmentId, Assignment>>>,
    logs: Arc<Mutex<HashMap<(AssignmentId, NaiveDate), ProgressLog>>>,
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn sorted_by_date(mut logs: Vec<ProgressLog>) -> Vec<ProgressLog> {
    logs.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.assignment_id.cmp(&b.assignment_id))
    });
    logs
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn insert_user(&self, user: User) -> Result<(), StorageError> {
        let mut guard = self.users.lock().map_err(poisoned)?;
        guard.insert(user.id().clone(), user);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn insert_lesson(&self, lesson: Lesson) -> Result<(), StorageError> {
        let mut guard = self.lessons.lock().map_err(poisoned)?;
        guard.insert(lesson.id().clone(), lesson);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn insert_topic(&self, topic: Topic) -> Result<(), StorageError> {
        let mut guard = self.topics.lock().map_err(poisoned)?;
        guard.insert(topic.id().clone(), topic);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn upsert_assignment(&self, assignment: Assignment) -> Result<(), StorageError> {
        let mut guard = self.assignments.lock().map_err(poisoned)?;
        guard.insert(assignment.id().clone(), assignment);
        Ok(())
    }

    /// Delete an assignment together with its progress logs.
    ///
    /// Returns the number of logs removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the assignment does not exist.
    pub fn delete_assignment(&self, id: &AssignmentId) -> Result<usize, StorageError> {
        let mut assignments = self.assignments.lock().map_err(poisoned)?;
        if assignments.remove(id).is_none() {
            return Err(StorageError::NotFound);
        }
        let mut logs = self.logs.lock().map_err(poisoned)?;
        let before = logs.len();
        logs.retain(|(assignment_id, _), _| assignment_id != id);
        Ok(before - logs.len())
    }

    fn assignment_ids_where<F>(&self, keep: F) -> Result<Vec<AssignmentId>, StorageError>
    where
        F: Fn(&Assignment) -> bool,
    {
        let guard = self.assignments.lock().map_err(poisoned)?;
        Ok(guard
            .values()
            .filter(|a| keep(a))
            .map(|a| a.id().clone())
            .collect())
    }

    fn logs_for_assignments(&self, ids: &[AssignmentId]) -> Result<Vec<ProgressLog>, StorageError> {
        let guard = self.logs.lock().map_err(poisoned)?;
        let found = guard
            .values()
            .filter(|l| ids.contains(&l.assignment_id))
            .cloned()
            .collect();
        Ok(sorted_by_date(found))
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StorageError> {
        let guard = self.users.lock().map_err(poisoned)?;
        Ok(guard.get(id).cloned())
    }
}

#[async_trait]
impl CurriculumRepository for InMemoryRepository {
    async fn get_lesson(&self, id: &LessonId) -> Result<Option<Lesson>, StorageError> {
        let guard = self.lessons.lock().map_err(poisoned)?;
        Ok(guard.get(id).cloned())
    }

    async fn get_topic(&self, id: &TopicId) -> Result<Option<Topic>, StorageError> {
        let guard = self.topics.lock().map_err(poisoned)?;
        Ok(guard.get(id).cloned())
    }

    async fn topics_for_lesson(&self, lesson_id: &LessonId) -> Result<Vec<Topic>, StorageError> {
        let guard = self.topics.lock().map_err(poisoned)?;
        let mut topics: Vec<Topic> = guard
            .values()
            .filter(|t| t.lesson_id() == lesson_id)
            .cloned()
            .collect();
        topics.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(topics)
    }
}

#[async_trait]
impl AssignmentRepository for InMemoryRepository {
    async fn get_assignment(&self, id: &AssignmentId) -> Result<Option<Assignment>, StorageError> {
        let guard = self.assignments.lock().map_err(poisoned)?;
        Ok(guard.get(id).cloned())
    }

    async fn assignments_for_student(
        &self,
        student_id: &UserId,
    ) -> Result<Vec<Assignment>, StorageError> {
        let guard = self.assignments.lock().map_err(poisoned)?;
        let mut found: Vec<Assignment> = guard
            .values()
            .filter(|a| a.student_id() == student_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(found)
    }
}

#[async_trait]
impl ProgressLogRepository for InMemoryRepository {
    async fn logs_for_student_topic(
        &self,
        student_id: &UserId,
        topic_id: &TopicId,
    ) -> Result<Vec<ProgressLog>, StorageError> {
        let ids = self
            .assignment_ids_where(|a| a.student_id() == student_id && a.topic_id() == topic_id)?;
        self.logs_for_assignments(&ids)
    }

    async fn logs_for_student(&self, student_id: &UserId) -> Result<Vec<ProgressLog>, StorageError> {
        let ids = self.assignment_ids_where(|a| a.student_id() == student_id)?;
        self.logs_for_assignments(&ids)
    }

    async fn logs_for_assignment(
        &self,
        assignment_id: &AssignmentId,
    ) -> Result<Vec<ProgressLog>, StorageError> {
        self.logs_for_assignments(std::slice::from_ref(assignment_id))
    }

    async fn upsert_log(&self, log: &ProgressLog) -> Result<(), StorageError> {
        {
            let assignments = self.assignments.lock().map_err(poisoned)?;
            if !assignments.contains_key(&log.assignment_id) {
                return Err(StorageError::NotFound);
            }
        }
        let mut guard = self.logs.lock().map_err(poisoned)?;
        guard.insert((log.assignment_id.clone(), log.date), log.clone());
        Ok(())
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub curriculum: Arc<dyn CurriculumRepository>,
    pub assignments: Arc<dyn AssignmentRepository>,
    pub progress_logs: Arc<dyn ProgressLogRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_in_memory(&InMemoryRepository::new())
    }

    /// Wrap an existing in-memory repository, keeping the caller's handle usable
    /// for seeding.
    #[must_use]
    pub fn from_in_memory(repo: &InMemoryRepository) -> Self {
        Self {
            users: Arc::new(repo.clone()),
            curriculum: Arc::new(repo.clone()),
            assignments: Arc::new(repo.clone()),
            progress_logs: Arc::new(repo.clone()),
        }
    }
}
