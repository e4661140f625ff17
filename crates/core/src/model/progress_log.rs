use std::ops::{Add, AddAssign};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::AssignmentId;

//
// ─── ANSWER COUNTS ─────────────────────────────────────────────────────────────
//

/// Right / wrong / empty / bonus answer counters.
///
/// Used both for a single day's log row and for sums over many rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerCounts {
    pub right: u64,
    pub wrong: u64,
    pub empty: u64,
    pub bonus: u64,
}

impl AnswerCounts {
    #[must_use]
    pub fn new(right: u64, wrong: u64, empty: u64, bonus: u64) -> Self {
        Self {
            right,
            wrong,
            empty,
            bonus,
        }
    }

    /// `right + wrong + empty + bonus`.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.right + self.wrong + self.empty + self.bonus
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl Add for AnswerCounts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            right: self.right + rhs.right,
            wrong: self.wrong + rhs.wrong,
            empty: self.empty + rhs.empty,
            bonus: self.bonus + rhs.bonus,
        }
    }
}

impl AddAssign for AnswerCounts {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<'a> std::iter::Sum<&'a AnswerCounts> for AnswerCounts {
    fn sum<I: Iterator<Item = &'a AnswerCounts>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, c| acc + *c)
    }
}

//
// ─── PROGRESS LOG ──────────────────────────────────────────────────────────────
//

/// One day's submitted counts for one assignment.
///
/// There is at most one row per `(assignment_id, date)`; a later submission
/// for the same day replaces the counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressLog {
    pub assignment_id: AssignmentId,
    pub date: NaiveDate,
    pub counts: AnswerCounts,
    pub updated_at: DateTime<Utc>,
}

impl ProgressLog {
    #[must_use]
    pub fn new(
        assignment_id: AssignmentId,
        date: NaiveDate,
        counts: AnswerCounts,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            assignment_id,
            date,
            counts,
            updated_at,
        }
    }
}
