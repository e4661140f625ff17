use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use storage::repository::{AssignmentRepository, ProgressLogRepository, StorageError};
use tutor_core::model::{AnswerCounts, AssignmentId, ProgressLog};

use crate::Clock;
use crate::cache::ProgressCache;
use crate::error::SubmissionError;
use crate::events::{EventBus, ProgressEvent};

/// Records a day's answers and drops the caches they affect.
#[derive(Clone)]
pub struct SubmissionService {
    clock: Clock,
    assignments: Arc<dyn AssignmentRepository>,
    logs: Arc<dyn ProgressLogRepository>,
    cache: ProgressCache,
    events: EventBus,
}

impl SubmissionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        assignments: Arc<dyn AssignmentRepository>,
        logs: Arc<dyn ProgressLogRepository>,
        cache: ProgressCache,
        events: EventBus,
    ) -> Self {
        Self {
            clock,
            assignments,
            logs,
            cache,
            events,
        }
    }

    /// Replaces the counts for `(assignment, date)` and invalidates the
    /// student's topic entry (and with it their lessons) and dual metrics.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError::AssignmentNotFound` if the assignment does not
    /// exist, or `SubmissionError::Storage` if persistence fails.
    pub async fn record(
        &self,
        assignment_id: &AssignmentId,
        date: NaiveDate,
        counts: AnswerCounts,
    ) -> Result<ProgressLog, SubmissionError> {
        let assignment = self
            .assignments
            .get_assignment(assignment_id)
            .await?
            .ok_or_else(|| SubmissionError::AssignmentNotFound(assignment_id.clone()))?;

        let now = self.clock.now();
        let log = ProgressLog::new(assignment_id.clone(), date, counts, now);
        self.logs.upsert_log(&log).await.map_err(|err| match err {
            // Deleted between the lookup and the write.
            StorageError::NotFound => SubmissionError::AssignmentNotFound(assignment_id.clone()),
            other => SubmissionError::Storage(other),
        })?;

        let student = assignment.student_id();
        self.cache
            .invalidate_topic(student, Some(assignment.topic_id()))
            .await;
        self.cache.invalidate_dual(student).await;

        self.events.emit_lossy(ProgressEvent::ProgressRecorded {
            student_id: student.clone(),
            assignment_id: assignment_id.clone(),
            topic_id: assignment.topic_id().clone(),
            timestamp: now,
        });
        info!(
            student = %student,
            assignment = %assignment_id,
            %date,
            total = counts.total(),
            "progress recorded"
        );
        Ok(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use storage::repository::{InMemoryRepository, Storage};
    use tutor_core::model::{
        Assignment, Lesson, LessonId, MetricsSettings, Topic, TopicId, User, UserId,
    };
    use tutor_core::time::{fixed_clock, fixed_now};

    use crate::progress_service::ProgressService;

    fn uid(raw: &str) -> UserId {
        UserId::parse(raw).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn a1() -> AssignmentId {
        AssignmentId::parse("a1").unwrap()
    }

    fn seeded() -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        repo.insert_user(User::student(uid("s1"), uid("t1"))).unwrap();
        let l1 = LessonId::parse("l1").unwrap();
        let tp1 = TopicId::parse("tp1").unwrap();
        repo.insert_lesson(Lesson::new(l1.clone(), "Math", None).unwrap())
            .unwrap();
        repo.insert_topic(Topic::new(tp1.clone(), l1, "Fractions").unwrap())
            .unwrap();
        repo.upsert_assignment(
            Assignment::new(a1(), uid("s1"), tp1, 100, 10, day(1), day(31)).unwrap(),
        )
        .unwrap();
        repo
    }

    fn services(repo: &InMemoryRepository) -> (ProgressService, SubmissionService) {
        let storage = Storage::from_in_memory(repo);
        let progress =
            ProgressService::with_settings(storage.clone(), &MetricsSettings::default(), fixed_clock());
        let submissions = SubmissionService::new(
            fixed_clock(),
            storage.assignments,
            storage.progress_logs,
            progress.cache().clone(),
            progress.events().clone(),
        );
        (progress, submissions)
    }

    #[tokio::test]
    async fn record_upserts_the_days_row() {
        let repo = seeded();
        let (_, submissions) = services(&repo);

        submissions
            .record(&a1(), day(2), AnswerCounts::new(5, 5, 0, 0))
            .await
            .unwrap();
        let log = submissions
            .record(&a1(), day(2), AnswerCounts::new(7, 3, 0, 1))
            .await
            .unwrap();
        assert_eq!(log.updated_at, fixed_now());

        let stored = repo.logs_for_assignment(&a1()).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].counts, AnswerCounts::new(7, 3, 0, 1));
    }

    #[tokio::test]
    async fn record_rejects_unknown_assignment() {
        let (_, submissions) = services(&seeded());
        let err = submissions
            .record(
                &AssignmentId::parse("ghost").unwrap(),
                day(1),
                AnswerCounts::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::AssignmentNotFound(_)));
    }

    #[tokio::test]
    async fn record_invalidates_cached_progress() {
        let repo = seeded();
        let (progress, submissions) = services(&repo);
        let s1 = uid("s1");
        let tp1 = TopicId::parse("tp1").unwrap();
        let l1 = LessonId::parse("l1").unwrap();

        submissions
            .record(&a1(), day(1), AnswerCounts::new(1, 1, 0, 0))
            .await
            .unwrap();
        progress.topic_progress(&s1, &tp1, None).await.unwrap();
        progress.lesson_progress(&s1, &l1, None).await.unwrap();
        progress.dual_metrics(&s1, None).await.unwrap();

        submissions
            .record(&a1(), day(2), AnswerCounts::new(8, 0, 0, 0))
            .await
            .unwrap();
        assert!(progress.cache().get_topic(&s1, &tp1).await.is_none());
        assert!(progress.cache().get_lesson(&s1, &l1).await.is_none());
        assert!(progress.cache().get_dual(&s1).await.is_none());

        let topic = progress.topic_progress(&s1, &tp1, None).await.unwrap();
        assert_eq!(topic.total_questions, 10);
        assert_eq!(topic.accuracy, 90.0);
        let dual = progress.dual_metrics(&s1, None).await.unwrap();
        assert_eq!(dual.program_progress, 10.0);
    }

    #[tokio::test]
    async fn record_publishes_progress_recorded() {
        let repo = seeded();
        let (progress, submissions) = services(&repo);
        let mut rx = progress.events().subscribe();

        submissions
            .record(&a1(), day(3), AnswerCounts::new(1, 0, 0, 0))
            .await
            .unwrap();
        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event,
            ProgressEvent::ProgressRecorded { ref topic_id, .. } if topic_id.as_str() == "tp1"
        ));
    }

    #[tokio::test]
    async fn dates_outside_the_window_are_still_recorded() {
        let repo = seeded();
        let (_, submissions) = services(&repo);
        let late = day(31) + Duration::days(1);
        submissions
            .record(&a1(), late, AnswerCounts::new(1, 0, 0, 0))
            .await
            .unwrap();
        assert_eq!(repo.logs_for_assignment(&a1()).await.unwrap().len(), 1);
    }
}
