use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use storage::repository::{
    AssignmentRepository, CurriculumRepository, ProgressLogRepository, Storage, UserRepository,
};
use tutor_core::model::{
    AnswerCounts, AssignmentId, AssignmentProgress, DualMetrics, Lesson, LessonId,
    LessonProgress, MetricsSettings, Topic, TopicId, TopicProgress, User, UserId,
};

use crate::Clock;
use crate::cache::ProgressCache;
use crate::error::ProgressError;
use crate::events::{EventBus, ProgressEvent};

/// Computes topic, lesson, dual and assignment progress for one student.
///
/// Every entry point takes an optional `teacher`; when present, the student
/// (and, for lessons, the lesson) must belong to that teacher. The `calculate_*`
/// methods always hit storage; the shorter-named methods go through the cache.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
    curriculum: Arc<dyn CurriculumRepository>,
    assignments: Arc<dyn AssignmentRepository>,
    logs: Arc<dyn ProgressLogRepository>,
    cache: ProgressCache,
    events: EventBus,
}

impl ProgressService {
    #[must_use]
    pub fn new(storage: Storage, cache: ProgressCache, events: EventBus, clock: Clock) -> Self {
        Self {
            clock,
            users: storage.users,
            curriculum: storage.curriculum,
            assignments: storage.assignments,
            logs: storage.progress_logs,
            cache,
            events,
        }
    }

    /// In-process caches and a fresh event bus sized from `settings`.
    #[must_use]
    pub fn with_settings(storage: Storage, settings: &MetricsSettings, clock: Clock) -> Self {
        Self::new(
            storage,
            ProgressCache::in_memory(settings.cache_ttl(), clock),
            EventBus::new(settings.event_capacity()),
            clock,
        )
    }

    #[must_use]
    pub fn cache(&self) -> &ProgressCache {
        &self.cache
    }

    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    //
    // ─── LOOKUPS ───────────────────────────────────────────────────────────────
    //

    async fn resolve_student(
        &self,
        student_id: &UserId,
        teacher: Option<&UserId>,
    ) -> Result<User, ProgressError> {
        let user = self
            .users
            .get_user(student_id)
            .await?
            .filter(User::is_student)
            .ok_or_else(|| ProgressError::StudentNotFound(student_id.clone()))?;

        if let Some(teacher) = teacher {
            if !user.belongs_to(teacher) {
                return Err(ProgressError::StudentTenantMismatch {
                    student: student_id.clone(),
                    teacher: teacher.clone(),
                });
            }
        }
        Ok(user)
    }

    async fn resolve_lesson(
        &self,
        lesson_id: &LessonId,
        teacher: Option<&UserId>,
    ) -> Result<Lesson, ProgressError> {
        let lesson = self
            .curriculum
            .get_lesson(lesson_id)
            .await?
            .ok_or_else(|| ProgressError::LessonNotFound(lesson_id.clone()))?;

        if let Some(teacher) = teacher {
            if !lesson.visible_to(teacher) {
                return Err(ProgressError::LessonTenantMismatch {
                    lesson: lesson_id.clone(),
                    teacher: teacher.clone(),
                });
            }
        }
        Ok(lesson)
    }

    async fn resolve_topic(&self, topic_id: &TopicId) -> Result<Topic, ProgressError> {
        self.curriculum
            .get_topic(topic_id)
            .await?
            .ok_or_else(|| ProgressError::TopicNotFound(topic_id.clone()))
    }

    //
    // ─── AGGREGATION ───────────────────────────────────────────────────────────
    //

    async fn aggregate_topic(
        &self,
        student: &User,
        topic: &Topic,
    ) -> Result<TopicProgress, ProgressError> {
        let logs = self
            .logs
            .logs_for_student_topic(student.id(), topic.id())
            .await?;
        let counts: AnswerCounts = logs.iter().map(|l| &l.counts).sum();
        let progress =
            TopicProgress::from_counts(student.id().clone(), topic.id().clone(), topic.name(), counts);

        self.events.emit_lossy(ProgressEvent::TopicProgressCalculated {
            student_id: progress.student_id.clone(),
            topic_id: progress.topic_id.clone(),
            teacher_id: student.teacher_id().cloned(),
            accuracy: progress.accuracy,
            total_questions: progress.total_questions,
            timestamp: self.clock.now(),
        });
        debug!(
            student = %progress.student_id,
            topic = %progress.topic_id,
            total = progress.total_questions,
            accuracy = progress.accuracy,
            "topic progress calculated"
        );
        Ok(progress)
    }

    async fn aggregate_lesson(
        &self,
        student: &User,
        lesson: &Lesson,
    ) -> Result<LessonProgress, ProgressError> {
        let topics = self.curriculum.topics_for_lesson(lesson.id()).await?;
        let mut results = Vec::with_capacity(topics.len());
        for topic in &topics {
            match self.aggregate_topic(student, topic).await {
                Ok(progress) => results.push(progress),
                Err(err) => {
                    warn!(
                        student = %student.id(),
                        lesson = %lesson.id(),
                        topic = %topic.id(),
                        error = %err,
                        "topic progress failed; counting it as empty"
                    );
                    results.push(TopicProgress::empty(
                        student.id().clone(),
                        topic.id().clone(),
                        topic.name(),
                    ));
                }
            }
        }
        Ok(LessonProgress::from_topics(
            student.id().clone(),
            lesson.id().clone(),
            lesson.name(),
            results,
        ))
    }

    async fn aggregate_dual(&self, student: &User) -> Result<DualMetrics, ProgressError> {
        let assigned: u64 = self
            .assignments
            .assignments_for_student(student.id())
            .await?
            .iter()
            .map(|a| u64::from(a.question_count()))
            .sum();
        let logs = self.logs.logs_for_student(student.id()).await?;
        let counts: AnswerCounts = logs.iter().map(|l| &l.counts).sum();
        Ok(DualMetrics::from_totals(
            student.id().clone(),
            counts,
            assigned,
        ))
    }

    //
    // ─── UNCACHED ──────────────────────────────────────────────────────────────
    //

    /// Sum of every log on the topic and the resulting accuracy.
    ///
    /// Publishes `ProgressEvent::TopicProgressCalculated`.
    ///
    /// # Errors
    ///
    /// Returns `StudentNotFound`, `StudentTenantMismatch`, `TopicNotFound`, or
    /// `Storage` if a lookup fails.
    pub async fn calculate_topic_progress(
        &self,
        student_id: &UserId,
        topic_id: &TopicId,
        teacher: Option<&UserId>,
    ) -> Result<TopicProgress, ProgressError> {
        let student = self.resolve_student(student_id, teacher).await?;
        let topic = self.resolve_topic(topic_id).await?;
        self.aggregate_topic(&student, &topic).await
    }

    /// Unweighted mean of the lesson's answered topics.
    ///
    /// A topic whose calculation fails is logged and counted as empty.
    ///
    /// # Errors
    ///
    /// Returns `StudentNotFound`, `StudentTenantMismatch`, `LessonNotFound`,
    /// `LessonTenantMismatch`, or `Storage` if the lesson or its topics cannot
    /// be read.
    pub async fn calculate_lesson_progress(
        &self,
        student_id: &UserId,
        lesson_id: &LessonId,
        teacher: Option<&UserId>,
    ) -> Result<LessonProgress, ProgressError> {
        let student = self.resolve_student(student_id, teacher).await?;
        let lesson = self.resolve_lesson(lesson_id, teacher).await?;
        self.aggregate_lesson(&student, &lesson).await
    }

    /// # Errors
    ///
    /// Returns `StudentNotFound`, `StudentTenantMismatch`, or `Storage`.
    pub async fn calculate_dual_metrics(
        &self,
        student_id: &UserId,
        teacher: Option<&UserId>,
    ) -> Result<DualMetrics, ProgressError> {
        let student = self.resolve_student(student_id, teacher).await?;
        self.aggregate_dual(&student).await
    }

    /// Completion of one assignment and whether `on` met its daily target.
    ///
    /// # Errors
    ///
    /// Returns `AssignmentNotFound`, the student errors of the assignment's
    /// owner, or `Storage`.
    pub async fn calculate_assignment_progress(
        &self,
        assignment_id: &AssignmentId,
        on: NaiveDate,
        teacher: Option<&UserId>,
    ) -> Result<AssignmentProgress, ProgressError> {
        let assignment = self
            .assignments
            .get_assignment(assignment_id)
            .await?
            .ok_or_else(|| ProgressError::AssignmentNotFound(assignment_id.clone()))?;
        self.resolve_student(assignment.student_id(), teacher).await?;
        let logs = self.logs.logs_for_assignment(assignment_id).await?;
        Ok(AssignmentProgress::compute(&assignment, &logs, on))
    }

    //
    // ─── CACHED ────────────────────────────────────────────────────────────────
    //
    // Tenant checks run before the cache is consulted; cache keys do not carry
    // the teacher.

    /// Cached `calculate_topic_progress`. Hits do not publish events.
    ///
    /// # Errors
    ///
    /// Same as `calculate_topic_progress`.
    pub async fn topic_progress(
        &self,
        student_id: &UserId,
        topic_id: &TopicId,
        teacher: Option<&UserId>,
    ) -> Result<TopicProgress, ProgressError> {
        let student = self.resolve_student(student_id, teacher).await?;
        if let Some(hit) = self.cache.get_topic(student_id, topic_id).await {
            return Ok(hit);
        }
        let topic = self.resolve_topic(topic_id).await?;
        let progress = self.aggregate_topic(&student, &topic).await?;
        self.cache.set_topic(&progress).await;
        Ok(progress)
    }

    /// Cached `calculate_lesson_progress`.
    ///
    /// # Errors
    ///
    /// Same as `calculate_lesson_progress`.
    pub async fn lesson_progress(
        &self,
        student_id: &UserId,
        lesson_id: &LessonId,
        teacher: Option<&UserId>,
    ) -> Result<LessonProgress, ProgressError> {
        let student = self.resolve_student(student_id, teacher).await?;
        let lesson = self.resolve_lesson(lesson_id, teacher).await?;
        if let Some(hit) = self.cache.get_lesson(student_id, lesson_id).await {
            return Ok(hit);
        }
        let progress = self.aggregate_lesson(&student, &lesson).await?;
        self.cache.set_lesson(&progress).await;
        Ok(progress)
    }

    /// Cached `calculate_dual_metrics`.
    ///
    /// # Errors
    ///
    /// Same as `calculate_dual_metrics`.
    pub async fn dual_metrics(
        &self,
        student_id: &UserId,
        teacher: Option<&UserId>,
    ) -> Result<DualMetrics, ProgressError> {
        let student = self.resolve_student(student_id, teacher).await?;
        if let Some(hit) = self.cache.get_dual(student_id).await {
            return Ok(hit);
        }
        let metrics = self.aggregate_dual(&student).await?;
        self.cache.set_dual(&metrics).await;
        Ok(metrics)
    }
}
