//! Pure arithmetic behind every progress figure.
//!
//! Percentages are rounded to two decimals and reported as `0.0` when the
//! denominator is zero. That zero is a product decision: the UI shows "0%"
//! for a topic nobody has touched yet, never "n/a".

use crate::model::{AnswerCounts, TopicProgress};

/// Rounds to two decimal places, half away from zero.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `round2(part / whole * 100)`, or `0.0` when `whole` is zero.
#[must_use]
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    // Counts stay far below 2^52, so the casts are exact.
    #[allow(clippy::cast_precision_loss)]
    let ratio = part as f64 / whole as f64;
    round2(ratio * 100.0)
}

/// Share of right answers among everything logged.
#[must_use]
pub fn accuracy(counts: &AnswerCounts) -> f64 {
    percentage(counts.right, counts.total())
}

/// Unweighted mean of topic accuracies, skipping topics with no questions.
///
/// A topic with 10 questions weighs the same as one with 1000.
#[must_use]
pub fn mean_accuracy<'a, I>(topics: I) -> f64
where
    I: IntoIterator<Item = &'a TopicProgress>,
{
    let (sum, n) = topics
        .into_iter()
        .filter(|t| t.total_questions > 0)
        .fold((0.0_f64, 0_u32), |(sum, n), t| (sum + t.accuracy, n + 1));
    if n == 0 {
        return 0.0;
    }
    round2(sum / f64::from(n))
}

/// Solved questions as a share of assigned questions.
#[must_use]
pub fn program_progress(solved: u64, assigned: u64) -> f64 {
    percentage(solved, assigned)
}

/// Right answers as a share of attempted questions.
#[must_use]
pub fn concept_mastery(right: u64, attempted: u64) -> f64 {
    percentage(right, attempted)
}
