use chrono::NaiveDate;
use thiserror::Error;

use crate::model::ids::{AssignmentId, TopicId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssignmentError {
    #[error("assignment ends ({end}) before it starts ({start})")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },
}

//
// ─── ASSIGNMENT ────────────────────────────────────────────────────────────────
//

/// Work assigned to one student on one topic.
///
/// `question_count` is the total number of questions assigned over the whole
/// window; `daily_target` is how many the student should solve per day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    id: AssignmentId,
    student_id: UserId,
    topic_id: TopicId,
    question_count: u32,
    daily_target: u32,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl Assignment {
    /// # Errors
    ///
    /// Returns `AssignmentError::InvalidWindow` if `end_date` is before `start_date`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: AssignmentId,
        student_id: UserId,
        topic_id: TopicId,
        question_count: u32,
        daily_target: u32,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self, AssignmentError> {
        if end_date < start_date {
            return Err(AssignmentError::InvalidWindow {
                start: start_date,
                end: end_date,
            });
        }
        Ok(Self {
            id,
            student_id,
            topic_id,
            question_count,
            daily_target,
            start_date,
            end_date,
        })
    }

    #[must_use]
    pub fn id(&self) -> &AssignmentId {
        &self.id
    }

    #[must_use]
    pub fn student_id(&self) -> &UserId {
        &self.student_id
    }

    #[must_use]
    pub fn topic_id(&self) -> &TopicId {
        &self.topic_id
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    #[must_use]
    pub fn daily_target(&self) -> u32 {
        self.daily_target
    }

    #[must_use]
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    #[must_use]
    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    /// Inclusive on both ends.
    #[must_use]
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}
