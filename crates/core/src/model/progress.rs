use chrono::NaiveDate;
use serde::Serialize;

use crate::metrics;
use crate::model::{
    AnswerCounts, Assignment, AssignmentId, LessonId, ProgressLog, TopicId, UserId,
};

//
// ─── TOPIC ─────────────────────────────────────────────────────────────────────
//

/// Aggregated counts and accuracy for one student on one topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicProgress {
    pub student_id: UserId,
    pub topic_id: TopicId,
    pub topic_name: String,
    pub counts: AnswerCounts,
    pub total_questions: u64,
    pub accuracy: f64,
}

impl TopicProgress {
    #[must_use]
    pub fn from_counts(
        student_id: UserId,
        topic_id: TopicId,
        topic_name: impl Into<String>,
        counts: AnswerCounts,
    ) -> Self {
        Self {
            student_id,
            topic_id,
            topic_name: topic_name.into(),
            total_questions: counts.total(),
            accuracy: metrics::accuracy(&counts),
            counts,
        }
    }

    /// Zero-progress placeholder for a topic whose calculation failed.
    #[must_use]
    pub fn empty(student_id: UserId, topic_id: TopicId, topic_name: impl Into<String>) -> Self {
        Self::from_counts(student_id, topic_id, topic_name, AnswerCounts::default())
    }
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgress {
    pub student_id: UserId,
    pub lesson_id: LessonId,
    pub lesson_name: String,
    pub topics: Vec<TopicProgress>,
    /// Topics that contributed to `accuracy` (those with any questions).
    pub active_topics: usize,
    pub total_questions: u64,
    pub accuracy: f64,
}

impl LessonProgress {
    #[must_use]
    pub fn from_topics(
        student_id: UserId,
        lesson_id: LessonId,
        lesson_name: impl Into<String>,
        topics: Vec<TopicProgress>,
    ) -> Self {
        Self {
            student_id,
            lesson_id,
            lesson_name: lesson_name.into(),
            active_topics: topics.iter().filter(|t| t.total_questions > 0).count(),
            total_questions: topics.iter().map(|t| t.total_questions).sum(),
            accuracy: metrics::mean_accuracy(&topics),
            topics,
        }
    }
}

//
// ─── DUAL METRICS ──────────────────────────────────────────────────────────────
//

/// Program progress (how much of the assigned work is done) next to concept
/// mastery (how much of the done work is right).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DualMetrics {
    pub student_id: UserId,
    pub counts: AnswerCounts,
    pub total_assigned: u64,
    pub total_solved: u64,
    pub program_progress: f64,
    pub concept_mastery: f64,
}

impl DualMetrics {
    #[must_use]
    pub fn from_totals(student_id: UserId, counts: AnswerCounts, total_assigned: u64) -> Self {
        let solved = counts.total();
        Self {
            student_id,
            total_assigned,
            total_solved: solved,
            program_progress: metrics::program_progress(solved, total_assigned),
            concept_mastery: metrics::concept_mastery(counts.right, solved),
            counts,
        }
    }
}

//
// ─── ASSIGNMENT ────────────────────────────────────────────────────────────────
//

/// Completion of one assignment plus the daily-target check for one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentProgress {
    pub assignment_id: AssignmentId,
    pub student_id: UserId,
    pub topic_id: TopicId,
    pub counts: AnswerCounts,
    pub question_count: u32,
    pub solved: u64,
    pub completion: f64,
    pub accuracy: f64,
    pub date: NaiveDate,
    pub solved_on_date: u64,
    pub daily_target: u32,
    pub daily_target_met: bool,
    pub active_on_date: bool,
}

impl AssignmentProgress {
    /// Logs belonging to other assignments are ignored.
    #[must_use]
    pub fn compute(assignment: &Assignment, logs: &[ProgressLog], date: NaiveDate) -> Self {
        let own: Vec<&ProgressLog> = logs
            .iter()
            .filter(|l| &l.assignment_id == assignment.id())
            .collect();
        let counts: AnswerCounts = own.iter().map(|l| &l.counts).sum();
        let solved_on_date = own
            .iter()
            .filter(|l| l.date == date)
            .map(|l| l.counts.total())
            .sum();
        let solved = counts.total();

        Self {
            assignment_id: assignment.id().clone(),
            student_id: assignment.student_id().clone(),
            topic_id: assignment.topic_id().clone(),
            question_count: assignment.question_count(),
            solved,
            completion: metrics::percentage(solved, u64::from(assignment.question_count())),
            accuracy: metrics::accuracy(&counts),
            counts,
            date,
            solved_on_date,
            daily_target: assignment.daily_target(),
            daily_target_met: solved_on_date >= u64::from(assignment.daily_target()),
            active_on_date: assignment.is_active_on(date),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn sid() -> UserId {
        UserId::parse("s1").unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn log(assignment: &str, date: NaiveDate, counts: AnswerCounts) -> ProgressLog {
        ProgressLog::new(AssignmentId::parse(assignment).unwrap(), date, counts, fixed_now())
    }

    #[test]
    fn topic_progress_derives_total_and_accuracy() {
        let progress = TopicProgress::from_counts(
            sid(),
            TopicId::parse("t1").unwrap(),
            "Fractions",
            AnswerCounts::new(300, 100, 50, 0),
        );
        assert_eq!(progress.total_questions, 450);
        assert_eq!(progress.accuracy, 66.67);
    }

    #[test]
    fn placeholder_topic_has_zero_progress() {
        let progress = TopicProgress::empty(sid(), TopicId::parse("t1").unwrap(), "Broken");
        assert_eq!(progress.total_questions, 0);
        assert_eq!(progress.accuracy, 0.0);
        assert_eq!(progress.topic_name, "Broken");
    }

    #[test]
    fn lesson_progress_sums_totals_and_averages_active_topics() {
        let topics = vec![
            TopicProgress::from_counts(
                sid(),
                TopicId::parse("t1").unwrap(),
                "A",
                AnswerCounts::new(8, 2, 0, 0),
            ),
            TopicProgress::from_counts(
                sid(),
                TopicId::parse("t2").unwrap(),
                "B",
                AnswerCounts::new(60, 30, 10, 0),
            ),
            TopicProgress::empty(sid(), TopicId::parse("t3").unwrap(), "C"),
        ];
        let lesson =
            LessonProgress::from_topics(sid(), LessonId::parse("l1").unwrap(), "Math", topics);
        assert_eq!(lesson.total_questions, 110);
        assert_eq!(lesson.active_topics, 2);
        assert_eq!(lesson.accuracy, 70.0);
        assert_eq!(lesson.topics.len(), 3);
    }

    #[test]
    fn dual_metrics_example() {
        let counts = AnswerCounts::new(1200, 200, 100, 0);
        let dual = DualMetrics::from_totals(sid(), counts, 2000);
        assert_eq!(dual.total_solved, 1500);
        assert_eq!(dual.program_progress, 75.0);
        assert_eq!(dual.concept_mastery, 80.0);
    }

    #[test]
    fn dual_metrics_without_assignments_or_attempts() {
        let none = DualMetrics::from_totals(sid(), AnswerCounts::default(), 0);
        assert_eq!(none.program_progress, 0.0);
        assert_eq!(none.concept_mastery, 0.0);

        let unattempted = DualMetrics::from_totals(sid(), AnswerCounts::default(), 500);
        assert_eq!(unattempted.program_progress, 0.0);
        assert_eq!(unattempted.concept_mastery, 0.0);
    }

    #[test]
    fn assignment_progress_tracks_completion_and_daily_target() {
        let assignment = Assignment::new(
            AssignmentId::parse("a1").unwrap(),
            sid(),
            TopicId::parse("t1").unwrap(),
            200,
            20,
            day(1),
            day(10),
        )
        .unwrap();
        let logs = vec![
            log("a1", day(2), AnswerCounts::new(15, 5, 0, 0)),
            log("a1", day(3), AnswerCounts::new(10, 2, 0, 0)),
            log("other", day(3), AnswerCounts::new(99, 0, 0, 0)),
        ];

        let on_day2 = AssignmentProgress::compute(&assignment, &logs, day(2));
        assert_eq!(on_day2.solved, 32);
        assert_eq!(on_day2.completion, 16.0);
        assert_eq!(on_day2.accuracy, 78.13);
        assert_eq!(on_day2.solved_on_date, 20);
        assert!(on_day2.daily_target_met);
        assert!(on_day2.active_on_date);

        let on_day3 = AssignmentProgress::compute(&assignment, &logs, day(3));
        assert_eq!(on_day3.solved_on_date, 12);
        assert!(!on_day3.daily_target_met);

        let after = AssignmentProgress::compute(&assignment, &logs, day(11));
        assert!(!after.active_on_date);
        assert_eq!(after.solved_on_date, 0);
    }

    #[test]
    fn serializes_camel_case_for_route_handlers() {
        let progress = TopicProgress::empty(sid(), TopicId::parse("t1").unwrap(), "A");
        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["topicId"], "t1");
        assert_eq!(json["totalQuestions"], 0);
        assert_eq!(json["accuracy"], 0.0);
    }
}
